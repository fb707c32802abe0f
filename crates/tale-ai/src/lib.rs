//! tale-ai: Prompt logs and the teller abstraction
//!
//! This crate provides the role-tagged [`Prompt`] log that is sent to a
//! generative model, the [`Teller`] trait every model backend implements,
//! and an OpenAI-compatible teller.

pub mod error;
pub mod overflow;
pub mod prompt;
pub mod providers;
pub mod teller;
pub mod types;

pub use error::{Error, Result};
pub use prompt::Prompt;
pub use teller::{Teller, estimate_tokens};
pub use types::*;
