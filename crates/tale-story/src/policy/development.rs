use std::sync::Arc;

use tale_ai::{Prompt, RoleNames, Teller};

use super::{NarrativePolicy, is_narrative, preserved_window, text_before};
use crate::condenser::{Condense, DevelopmentCondenser};

/// User and bot discuss and iterate on storyline options rather than
/// telling the story itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Development;

impl NarrativePolicy for Development {
    fn name(&self) -> &str {
        "development"
    }

    fn default_instruction(&self, roles: &RoleNames) -> String {
        let (user, bot) = (&roles.user, &roles.bot);
        format!(
            "The {bot} and the {user} will develop a story together.\n\
             The {user} may ask the {bot} for options for how the storyline could develop, \
             and the {bot} shall list them as numbered items.\n\
             The {user} may critique options by quoting their numbers in square brackets, \
             like [1] or [2, 3], and may add instructions to steer the story.\n\
             The {bot} shall iterate, taking the {user}'s new instructions into account."
        )
    }

    fn first_preserved_index(&self, prompt: &Prompt, pairs: usize) -> isize {
        preserved_window(prompt, pairs)
    }

    fn condensable_text(&self, prompt: &Prompt, preserved_index: isize) -> String {
        text_before(prompt, preserved_index, is_narrative)
    }

    fn story_text(&self, prompt: &Prompt) -> String {
        prompt.contents().join("\n\n")
    }

    fn condenser(&self, teller: Arc<dyn Teller>, _folds: usize) -> Box<dyn Condense> {
        Box::new(DevelopmentCondenser::new(teller))
    }
}
