use tale_ai::{Prompt, RoleNames};

use super::{NarrativePolicy, align_to_user_turn, is_prose, preserved_window, text_before};

/// The user outlines each segment and the bot polishes it into narration
/// and moves the story on. Only the bot's prose is the story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolishProgress;

impl NarrativePolicy for PolishProgress {
    fn name(&self) -> &str {
        "polish_progress"
    }

    fn default_instruction(&self, roles: &RoleNames) -> String {
        let (user, bot) = (&roles.user, &roles.bot);
        format!(
            "The {user} will outline the next segment of the story.\n\
             Special instructions from the {user} to the {bot} are enclosed in square brackets.\n\
             The {bot} shall first elaborate upon the {user}'s outline, describing the scenery \
             and the characters' actions, emotions and sensations in more detail, and then \
             continue the story by making up new situations for the {user}.\n\
             When asked in square brackets, the {bot} shall list alternative continuations as a \
             numbered list, and never otherwise. A later answer from the {user} names the chosen \
             number in square brackets, and the {bot} continues along that branch."
        )
    }

    fn first_preserved_index(&self, prompt: &Prompt, pairs: usize) -> isize {
        align_to_user_turn(prompt, preserved_window(prompt, pairs))
    }

    fn condensable_text(&self, prompt: &Prompt, preserved_index: isize) -> String {
        text_before(prompt, preserved_index, is_prose)
    }

    fn story_text(&self, prompt: &Prompt) -> String {
        prompt.bot_contents().join("\n\n")
    }
}
