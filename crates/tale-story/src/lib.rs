//! tale-story: A self-condensing story log for LLM storytelling
//!
//! A [`Story`] keeps the complete conversation in an archived log while the
//! teller sees a working log held under a token budget. When the budget is
//! exceeded, older messages are replaced by a teller-written summary chosen
//! by a [`NarrativePolicy`].

pub mod condenser;
pub mod config;
pub mod error;
pub mod index;
pub mod paraphrase;
pub mod policy;
pub mod snapshot;
pub mod story;

#[cfg(test)]
pub(crate) mod testing;

pub use condenser::{Condense, Condenser, DevelopmentCondenser};
pub use config::StoryConfig;
pub use error::{Error, Result};
pub use index::Placement;
pub use paraphrase::Paraphraser;
pub use policy::{Development, Interactive, NarrativePolicy, PolishProgress};
pub use snapshot::StorySnapshot;
pub use story::{CondenseReason, CondenseReport, Story};
