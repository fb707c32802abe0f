//! Core message types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and fixed context
    System,
    /// The human side of the conversation
    User,
    /// The model side of the conversation
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::System => "system",
            Role::User => "user",
            Role::Bot => "bot",
        })
    }
}

/// The names a backend uses for each [`Role`] on the wire and in instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleNames {
    pub system: String,
    pub user: String,
    pub bot: String,
}

impl Default for RoleNames {
    fn default() -> Self {
        Self::new("system", "user", "assistant")
    }
}

impl RoleNames {
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        bot: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            bot: bot.into(),
        }
    }

    /// Get the configured name for a role
    pub fn name(&self, role: Role) -> &str {
        match role {
            Role::System => &self.system,
            Role::User => &self.user,
            Role::Bot => &self.bot,
        }
    }
}

/// A single role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a bot message
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content)
    }
}
