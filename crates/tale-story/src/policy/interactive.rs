use tale_ai::{Prompt, Role, RoleNames};

use super::{NarrativePolicy, align_to_user_turn, is_narrative, is_prose, preserved_window, text_before};

/// Turn-based storytelling: the user plays their characters, the bot plays
/// the rest and sets up the next situation.
///
/// With `rewrite`, the bot also rewrites the user's outline into prose, so
/// only bot messages carry the story and only they are condensed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interactive {
    pub rewrite: bool,
}

impl Interactive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rewriting() -> Self {
        Self { rewrite: true }
    }
}

impl NarrativePolicy for Interactive {
    fn name(&self) -> &str {
        "interactive"
    }

    fn default_instruction(&self, roles: &RoleNames) -> String {
        let (user, bot) = (&roles.user, &roles.bot);
        let response = if self.rewrite {
            format!(
                "The {bot} shall respond in two parts. First, elaborate upon and rewrite \
                 the {user}'s outline. Then act in response to the {user}'s characters and \
                 make up the next situation for the {user} to respond to. The two parts \
                 shall flow together without notes or part numbers."
            )
        } else {
            format!(
                "The {bot} shall act in response to the {user}'s characters and make up \
                 the next situation for the {user} to respond to."
            )
        };
        format!(
            "The story shall read as if told by the {user}, who acts as their own characters.\n\
             Special instructions from the {user} to the {bot} are enclosed in square brackets.\n\
             {response}\n\
             Dialog shall be quoted in double quotes (\").\n\
             The {bot} shall not act for the {user}'s characters unless instructed to."
        )
    }

    fn first_preserved_index(&self, prompt: &Prompt, pairs: usize) -> isize {
        align_to_user_turn(prompt, preserved_window(prompt, pairs))
    }

    fn condensable_text(&self, prompt: &Prompt, preserved_index: isize) -> String {
        if self.rewrite {
            text_before(prompt, preserved_index, is_prose)
        } else {
            text_before(prompt, preserved_index, is_narrative)
        }
    }

    fn story_text(&self, prompt: &Prompt) -> String {
        prompt.contents().join("\n\n")
    }

    fn rework_outline(&self, archived: &Prompt) -> Option<String> {
        if !self.rewrite || archived.last_role() != Some(Role::Bot) {
            return None;
        }
        match archived.message(-2) {
            Ok(m) if m.role == Role::User => Some(m.content.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::exchange;

    #[test]
    fn test_preserved_index_keeps_whole_turns() {
        let mut prompt = exchange(4);
        assert_eq!(Interactive::new().first_preserved_index(&prompt, 2), -4);

        prompt.user("user 5", false);
        // -4 would start at "bot 3"
        assert_eq!(Interactive::new().first_preserved_index(&prompt, 2), -5);
    }

    #[test]
    fn test_condensable_text_by_mode() {
        let prompt = exchange(3);
        assert_eq!(
            Interactive::new().condensable_text(&prompt, -2),
            "user 1\n\nbot 1\n\nuser 2\n\nbot 2"
        );
        assert_eq!(
            Interactive::rewriting().condensable_text(&prompt, -2),
            "bot 1\n\nbot 2"
        );
    }

    #[test]
    fn test_story_text_includes_everything() {
        let mut prompt = Prompt::new(RoleNames::default());
        prompt.user("go", false);
        prompt.bot("went", false);
        assert_eq!(Interactive::new().story_text(&prompt), "go\n\nwent");
    }

    #[test]
    fn test_instruction_uses_role_names() {
        let roles = RoleNames::new("system", "player", "narrator");
        let text = Interactive::rewriting().default_instruction(&roles);
        assert!(text.contains("told by the player"));
        assert!(text.contains("rewrite the player's outline"));
        assert!(!Interactive::new().default_instruction(&roles).contains("rewrite"));
    }

    #[test]
    fn test_rework_outline_only_when_rewriting() {
        let prompt = exchange(2);
        assert_eq!(
            Interactive::rewriting().rework_outline(&prompt).as_deref(),
            Some("user 2")
        );
        assert_eq!(Interactive::new().rework_outline(&prompt), None);
    }
}
