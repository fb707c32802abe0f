//! Summarizing older story text through a teller

use std::sync::Arc;

use async_trait::async_trait;
use tale_ai::{Result, RoleNames, Teller};

/// Something that turns a stretch of story text into a shorter summary.
///
/// `Ok(None)` means the teller produced nothing. Overflow errors are
/// returned unchanged so the story can fall back to a smaller source.
#[async_trait]
pub trait Condense: Send + Sync {
    async fn condense(&self, text: &str) -> Result<Option<String>>;
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

/// One-shot summary of plain story text
pub struct Condenser {
    teller: Arc<dyn Teller>,
    folds: usize,
    instruction: String,
}

impl Condenser {
    pub fn new(teller: Arc<dyn Teller>, folds: usize) -> Self {
        let instruction = Self::default_instruction(&teller.roles());
        Self {
            teller,
            folds,
            instruction,
        }
    }

    pub fn default_instruction(roles: &RoleNames) -> String {
        format!(
            "The {} shall condense the story given by the {}.",
            roles.bot, roles.user
        )
    }

    /// Minimum summary length for `text`, if folding is enabled
    fn length_requirement(&self, text: &str) -> Option<String> {
        if self.folds == 0 {
            return None;
        }
        let words = text.split_whitespace().count() / self.folds;
        Some(format!(
            "The length of the condensed result shall be at least {} words.",
            words
        ))
    }
}

#[async_trait]
impl Condense for Condenser {
    async fn condense(&self, text: &str) -> Result<Option<String>> {
        let mut system = self.instruction.clone();
        if let Some(requirement) = self.length_requirement(text) {
            system.push('\n');
            system.push_str(&requirement);
        }

        let mut prompt = self.teller.create_prompt();
        prompt.system(system, false);
        prompt.user(text, false);

        Ok(non_empty(self.teller.complete(&prompt).await?))
    }
}

/// Two-pass condenser for story-development discussions: a summary of the
/// discussion, then the requirements the user has settled on.
pub struct DevelopmentCondenser {
    teller: Arc<dyn Teller>,
    summarize_instruction: String,
    requirement_instruction: String,
}

impl DevelopmentCondenser {
    pub fn new(teller: Arc<dyn Teller>) -> Self {
        let roles = teller.roles();
        Self {
            summarize_instruction: "Summarize the story development so far.".to_string(),
            requirement_instruction: format!(
                "So the {user} and the {bot} can continue their storyline discussion, \
                 list the requirements of the story so far. The requirements shall be \
                 based on the feedback from the {user} to the {bot}'s suggestions, and \
                 exclude those already included in the summary above.",
                user = roles.user,
                bot = roles.bot,
            ),
            teller,
        }
    }
}

#[async_trait]
impl Condense for DevelopmentCondenser {
    async fn condense(&self, text: &str) -> Result<Option<String>> {
        let mut prompt = self.teller.create_prompt();
        prompt.user(text, false);
        prompt.system(self.summarize_instruction.clone(), false);

        let mut sections = Vec::new();
        let summary = non_empty(self.teller.complete(&prompt).await?);

        // The summary stands in for the instruction as context for the second pass
        prompt.delete(-1, None)?;
        if let Some(summary) = summary {
            let section = format!("Summary of story thus far:\n\n{}", summary);
            prompt.system(section.clone(), false);
            sections.push(section);
        }

        prompt.system(self.requirement_instruction.clone(), false);
        if let Some(requirements) = non_empty(self.teller.complete(&prompt).await?) {
            sections.push(format!(
                "Requirements for storyline development:\n\n{}",
                requirements
            ));
        }

        Ok(non_empty(sections.join("\n\n")))
    }
}
