//! Scripted teller used by the unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use tale_ai::{Error, Prompt, Result, Role, RoleNames, Teller};

type OverflowPredicate = Box<dyn Fn(&Prompt) -> bool + Send + Sync>;

/// Sizes text by whitespace-separated words. Story turns are answered with
/// `"bot reply {n} is here"` (5 words) and condensation requests with
/// `"summary {n}"` (2 words), `n` counting successful completions.
pub(crate) struct MockTeller {
    completions: Mutex<usize>,
    calls: Mutex<Vec<Prompt>>,
    overflow_when: Option<OverflowPredicate>,
}

impl MockTeller {
    pub(crate) fn new() -> Self {
        Self {
            completions: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            overflow_when: None,
        }
    }

    /// Fail with `ContextTooLarge` whenever `predicate` holds for the prompt
    pub(crate) fn overflowing_when(
        predicate: impl Fn(&Prompt) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            overflow_when: Some(Box::new(predicate)),
            ..Self::new()
        }
    }

    /// Every prompt passed to `complete`, including failed ones
    pub(crate) fn calls(&self) -> Vec<Prompt> {
        self.calls.lock().clone()
    }

    pub(crate) fn condense_calls(&self) -> usize {
        self.calls.lock().iter().filter(|p| is_condense_request(p)).count()
    }
}

/// Whether a prompt came from a condenser rather than the story itself
pub(crate) fn is_condense_request(prompt: &Prompt) -> bool {
    prompt.len() == 2
        && prompt.role(0).is_ok_and(|r| r == Role::System)
        && prompt.get(0).is_ok_and(|s| s.contains("condense"))
}

pub(crate) fn words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[async_trait]
impl Teller for MockTeller {
    fn name(&self) -> &str {
        "mock"
    }

    fn roles(&self) -> RoleNames {
        RoleNames::default()
    }

    fn size_of(&self, text: &str) -> usize {
        words(text)
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.calls.lock().push(prompt.clone());

        if let Some(predicate) = &self.overflow_when {
            if predicate(prompt) {
                return Err(Error::ContextTooLarge(format!(
                    "mock limit exceeded by {} words",
                    self.size_of_prompt(prompt)
                )));
            }
        }

        let mut completions = self.completions.lock();
        *completions += 1;
        if is_condense_request(prompt) {
            Ok(format!("summary {}", *completions))
        } else {
            Ok(format!("bot reply {} is here", *completions))
        }
    }
}

/// Route `tracing` output through the test harness when `RUST_LOG` is set
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
