//! Story configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tunables for a [`Story`](crate::Story)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Condense once the working log grows past this many tokens
    pub max_prompt_tokens: usize,
    /// Ask for a summary of at least `words / condense_folds` words (0 = no minimum)
    pub condense_folds: usize,
    /// Exchange pairs kept verbatim when condensing
    pub preserved_from_condense: usize,
    /// Log every produced summary at info level
    pub condense_review: bool,
    /// Instruction heading the working log; the policy default when unset
    pub instruction: Option<String>,
    /// Optional standing context placed after the instruction
    pub setting: Option<String>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: 6500,
            condense_folds: 3,
            preserved_from_condense: 3,
            condense_review: false,
            instruction: None,
            setting: None,
        }
    }
}

impl StoryConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn with_max_prompt_tokens(mut self, tokens: usize) -> Self {
        self.max_prompt_tokens = tokens;
        self
    }

    pub fn with_condense_folds(mut self, folds: usize) -> Self {
        self.condense_folds = folds;
        self
    }

    pub fn with_preserved_from_condense(mut self, pairs: usize) -> Self {
        self.preserved_from_condense = pairs;
        self
    }

    pub fn with_condense_review(mut self, review: bool) -> Self {
        self.condense_review = review;
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_setting(mut self, setting: impl Into<String>) -> Self {
        self.setting = Some(setting.into());
        self
    }
}
