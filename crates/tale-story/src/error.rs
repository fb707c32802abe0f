//! Error types for tale-story

use thiserror::Error;

/// Result type alias using tale-story Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while maintaining a story
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the prompt or teller layer
    #[error(transparent)]
    Ai(#[from] tale_ai::Error),

    /// Condensing overflowed the teller even from the already-condensed working log
    #[error(
        "{source}\nConsider keeping fewer messages out of condensation \
         (currently preserved_from_condense={preserved})"
    )]
    CondenseOverflow {
        preserved: usize,
        source: tale_ai::Error,
    },

    /// A saved story was written by a different narrative policy
    #[error("Incompatible story type {found} ({expected} expected)")]
    IncompatibleStory { expected: String, found: String },

    /// A saved story was written for a teller this one cannot stand in for
    #[error("Incompatible teller {found} ({expected} expected)")]
    IncompatibleTeller { expected: String, found: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or unparsable configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error means the teller could not take a large enough prompt
    pub fn is_context_overflow(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_context_overflow(),
            Error::CondenseOverflow { .. } => true,
            _ => false,
        }
    }
}
