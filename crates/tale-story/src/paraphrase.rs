//! Rewriting a single passage under a caller instruction

use std::sync::Arc;

use tale_ai::{Result, Teller};

const DEFAULT_REQUEST: &str = "Please paraphrase.";

/// Asks a teller to rewrite one passage, optionally with the standing
/// setting and the user outline the passage was written from.
pub struct Paraphraser {
    teller: Arc<dyn Teller>,
    original: String,
    setting: Option<String>,
    outline: Option<String>,
}

impl Paraphraser {
    pub fn new(teller: Arc<dyn Teller>, original: impl Into<String>) -> Self {
        Self {
            teller,
            original: original.into(),
            setting: None,
            outline: None,
        }
    }

    pub fn with_setting(mut self, setting: Option<String>) -> Self {
        self.setting = setting;
        self
    }

    pub fn with_outline(mut self, outline: Option<String>) -> Self {
        self.outline = outline;
        self
    }

    /// Rewrite the passage. `None` asks for a plain paraphrase.
    pub async fn rephrase(&self, instruction: Option<&str>) -> Result<Option<String>> {
        let mut prompt = self.teller.create_prompt();
        let user = prompt.roles().user.clone();

        if let Some(setting) = &self.setting {
            prompt.system(setting.clone(), false);
        }
        prompt.system(
            format!(
                "Rewrite and modify the text below with instructions given by the {}.\n===\n{}",
                user, self.original
            ),
            false,
        );
        if let Some(outline) = &self.outline {
            prompt.system(
                format!("The text was written from this outline by the {}:\n===\n{}", user, outline),
                false,
            );
        }
        prompt.user(instruction.unwrap_or(DEFAULT_REQUEST), false);

        let rephrased = self.teller.complete(&prompt).await?;
        Ok(if rephrased.trim().is_empty() {
            None
        } else {
            Some(rephrased)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTeller;

    #[tokio::test]
    async fn test_plain_paraphrase() {
        let teller = Arc::new(MockTeller::new());
        let result = Paraphraser::new(teller.clone(), "The door creaked open.")
            .rephrase(None)
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("bot reply 1 is here"));

        let prompt = &teller.calls()[0];
        assert_eq!(prompt.len(), 2);
        assert!(prompt.get(0).unwrap().ends_with("===\nThe door creaked open."));
        assert_eq!(prompt.get(1).unwrap(), "Please paraphrase.");
    }

    #[tokio::test]
    async fn test_setting_and_outline() {
        let teller = Arc::new(MockTeller::new());
        Paraphraser::new(teller.clone(), "She ran.")
            .with_setting(Some("A rainy harbor town.".to_string()))
            .with_outline(Some("April runs to the pier.".to_string()))
            .rephrase(Some("Make it slower."))
            .await
            .unwrap();

        let prompt = &teller.calls()[0];
        assert_eq!(prompt.len(), 4);
        assert_eq!(prompt.get(0).unwrap(), "A rainy harbor town.");
        assert!(prompt.get(2).unwrap().ends_with("April runs to the pier."));
        assert_eq!(prompt.get(-1).unwrap(), "Make it slower.");
    }
}
