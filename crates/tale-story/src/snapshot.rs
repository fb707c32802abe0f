//! Persisted form of a story

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tale_ai::{Message, RoleNames};

use crate::error::Result;

/// Everything needed to resume a story with a compatible teller and policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySnapshot {
    pub id: String,
    /// Creation time, ms since the Unix epoch
    pub created_at: i64,
    /// Name of the narrative policy
    pub story_type: String,
    /// Name of the teller that produced the story
    pub teller: String,
    pub roles: RoleNames,
    /// The full archived log
    pub story: Vec<Message>,
    pub uncondensed: usize,
    pub condensing_from_archive: bool,
    pub max_prompt_tokens: usize,
    pub preserved_from_condense: usize,
    pub condense_folds: usize,
    #[serde(default)]
    pub condense_review: bool,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
    /// Current summary, absent while nothing has been condensed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condensed: Option<String>,
}

impl StorySnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write as pretty JSON, creating parent directories as needed
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample() -> StorySnapshot {
        StorySnapshot {
            id: "4b1f0c8e-0000-4000-8000-000000000000".into(),
            created_at: 1_700_000_000_000,
            story_type: "interactive".into(),
            teller: "mock".into(),
            roles: RoleNames::default(),
            story: vec![Message::user("go north"), Message::bot("a cave")],
            uncondensed: 2,
            condensing_from_archive: true,
            max_prompt_tokens: 6500,
            preserved_from_condense: 3,
            condense_folds: 3,
            condense_review: false,
            instruction: "Tell a story.".into(),
            setting: None,
            condensed: None,
        }
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = sample().to_json().unwrap();
        assert!(!json.contains("\"condensed\""));
        assert!(!json.contains("\"setting\""));
        assert!(json.contains("\"role\": \"bot\""));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value.as_object_mut().unwrap().remove("condense_review");
        let snapshot: StorySnapshot = serde_json::from_value(value).unwrap();
        assert!(!snapshot.condense_review);
        assert_eq!(snapshot.condensed, None);
    }

    #[test]
    fn test_write_and_read() {
        let dir = std::env::temp_dir().join(format!("tale-{}", uuid::Uuid::new_v4()));
        let path = dir.join("story.json");

        let mut snapshot = sample();
        snapshot.condensed = Some("They found a cave.".into());
        snapshot.write(&path).unwrap();
        assert_eq!(StorySnapshot::read(&path).unwrap(), snapshot);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_garbage_is_json_error() {
        assert!(matches!(
            StorySnapshot::from_json("{ not json"),
            Err(Error::Json(_))
        ));
    }
}
