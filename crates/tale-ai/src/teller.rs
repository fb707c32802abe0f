//! The teller abstraction: anything that can continue a prompt and measure it.

use async_trait::async_trait;

use crate::error::Result;
use crate::prompt::Prompt;
use crate::types::{Message, RoleNames};

/// Estimate token count for a piece of text (chars/4 heuristic, rounded up)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// A generative model backend.
///
/// Sizes must be monotonic and additive over messages: the story layer keeps
/// a running total by adding and subtracting [`Teller::size_of_message`]
/// and expects it to match [`Teller::size_of_prompt`].
#[async_trait]
pub trait Teller: Send + Sync {
    /// Name persisted alongside saved stories
    fn name(&self) -> &str;

    /// Whether a story saved by a teller called `name` can be resumed here
    fn is_compatible(&self, name: &str) -> bool {
        name == self.name()
    }

    /// Role names used by prompts created for this teller
    fn roles(&self) -> RoleNames;

    /// Create an empty prompt bound to this teller's role names
    fn create_prompt(&self) -> Prompt {
        Prompt::new(self.roles())
    }

    /// Size of a piece of text in tokens
    fn size_of(&self, text: &str) -> usize;

    fn size_of_message(&self, message: &Message) -> usize {
        self.size_of(&message.content)
    }

    fn size_of_prompt(&self, prompt: &Prompt) -> usize {
        prompt.iter().map(|m| self.size_of_message(m)).sum()
    }

    /// Produce the next bot message for `prompt`.
    ///
    /// Fails with [`Error::ContextTooLarge`](crate::Error::ContextTooLarge)
    /// when the prompt plus the expected completion exceeds the model limit.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Complete `prompt` and append the result to it as a bot message
    /// (overwriting a trailing bot message when `redo` is set).
    async fn generate(&self, prompt: &mut Prompt, redo: bool) -> Result<String> {
        let completed = self.complete(prompt).await?;
        prompt.bot(completed.clone(), redo);
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    struct EchoTeller;

    #[async_trait]
    impl Teller for EchoTeller {
        fn name(&self) -> &str {
            "echo"
        }

        fn roles(&self) -> RoleNames {
            RoleNames::default()
        }

        fn size_of(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }

        async fn complete(&self, prompt: &Prompt) -> Result<String> {
            Ok(format!("echo: {}", prompt.get(-1)?))
        }
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("Hello world!"), 3);
        assert_eq!(estimate_tokens(&"x".repeat(401)), 101);
    }

    #[test]
    fn test_default_sizes_are_additive() {
        let teller = EchoTeller;
        let mut prompt = teller.create_prompt();
        prompt.system("one two three", false);
        prompt.user("four five", false);
        assert_eq!(teller.size_of_prompt(&prompt), 5);
        assert_eq!(teller.size_of_message(&prompt.messages()[1]), 2);
    }

    #[test]
    fn test_default_compatibility_is_by_name() {
        assert!(EchoTeller.is_compatible("echo"));
        assert!(!EchoTeller.is_compatible("gpt"));
    }

    #[tokio::test]
    async fn test_generate_appends_or_redoes() {
        let teller = EchoTeller;
        let mut prompt = teller.create_prompt();
        prompt.user("hello", false);

        let first = teller.generate(&mut prompt, false).await.unwrap();
        assert_eq!(first, "echo: hello");
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt.role(-1).unwrap(), Role::Bot);

        let second = teller.generate(&mut prompt, true).await.unwrap();
        assert_eq!(second, "echo: echo: hello");
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt.get(-1).unwrap(), "echo: echo: hello");
    }

    #[tokio::test]
    async fn test_generate_propagates_errors() {
        let teller = EchoTeller;
        let mut prompt = teller.create_prompt();
        assert!(teller.generate(&mut prompt, false).await.is_err());
        assert!(prompt.is_empty());
    }
}
