//! Narrative policies: what a story condenses, what it keeps, and how it
//! instructs the teller.

mod development;
mod interactive;
mod polish;

pub use development::Development;
pub use interactive::Interactive;
pub use polish::PolishProgress;

use std::sync::Arc;

use tale_ai::{Message, Prompt, Role, RoleNames, Teller};

use crate::condenser::{Condense, Condenser};

/// Strategy object injected into a [`Story`](crate::Story)
pub trait NarrativePolicy: Send + Sync {
    /// Story type persisted in snapshots
    fn name(&self) -> &str;

    /// Instruction used when the configuration does not supply one
    fn default_instruction(&self, roles: &RoleNames) -> String;

    /// Offset from the end (`<= 0`) of the first message kept verbatim when
    /// `prompt` is condensed with `pairs` exchanges preserved
    fn first_preserved_index(&self, prompt: &Prompt, pairs: usize) -> isize;

    /// Text handed to the condenser: the messages before `preserved_index`
    fn condensable_text(&self, prompt: &Prompt, preserved_index: isize) -> String;

    /// Export of the whole archived story
    fn story_text(&self, prompt: &Prompt) -> String;

    fn condenser(&self, teller: Arc<dyn Teller>, folds: usize) -> Box<dyn Condense> {
        Box::new(Condenser::new(teller, folds))
    }

    /// Outline the last archived message was written from, if the policy
    /// keeps one for rewrites
    fn rework_outline(&self, _archived: &Prompt) -> Option<String> {
        None
    }
}

/// `-2 * pairs`, clamped to the prompt length
pub(crate) fn preserved_window(prompt: &Prompt, pairs: usize) -> isize {
    -((2 * pairs).min(prompt.len()) as isize)
}

/// Step back over a bot reply so it is never kept without its user turn
pub(crate) fn align_to_user_turn(prompt: &Prompt, index: isize) -> isize {
    if index < 0
        && (-index as usize) < prompt.len()
        && prompt.role(index).is_ok_and(|r| r == Role::Bot)
    {
        index - 1
    } else {
        index
    }
}

/// Contents of the messages before `preserved_index` matching `keep`, as paragraphs
pub(crate) fn text_before(
    prompt: &Prompt,
    preserved_index: isize,
    keep: impl Fn(&Message) -> bool,
) -> String {
    let end = (prompt.len() as isize + preserved_index).clamp(0, prompt.len() as isize) as usize;
    prompt.messages()[..end]
        .iter()
        .filter(|m| keep(m))
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(crate) fn is_narrative(message: &Message) -> bool {
    message.role != Role::System
}

pub(crate) fn is_prose(message: &Message) -> bool {
    message.role == Role::Bot
}

#[cfg(test)]
pub(crate) fn exchange(rounds: usize) -> Prompt {
    let mut prompt = Prompt::new(RoleNames::default());
    prompt.system("Tell a story.", false);
    for n in 1..=rounds {
        prompt.user(format!("user {}", n), false);
        prompt.bot(format!("bot {}", n), false);
    }
    prompt
}
