use settings_store::Settings;
use transcript::parser::COMMENT_PREFIX;
use transcript::Role;

pub const NEW_DIALOGUE_COMMAND_ID: &str = "new-dialogue";
pub const NEW_DIALOGUE_COMMAND_NAME: &str = "New dialogue";

/// Fence used for new blocks; four backticks leave room for code in answers.
pub const BLOCK_FENCE: &str = "````";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub id: &'static str,
    pub name: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[CommandSpec {
    id: NEW_DIALOGUE_COMMAND_ID,
    name: NEW_DIALOGUE_COMMAND_NAME,
}];

/// Editor the command writes into.
pub trait EditorHost {
    /// Replaces the selection, or inserts at the cursor when nothing is selected.
    fn replace_selection(&mut self, text: &str);
}

/// Text of a fresh dialogue block built from the current settings.
///
/// Without a default system prompt the system line is inserted disabled, so
/// it is easy to fill in and enable later.
pub fn new_dialogue_block(settings: &Settings) -> String {
    let mut block = format!("{BLOCK_FENCE}{}\n", crate::BLOCK_LANGUAGE);
    if !settings.template.is_empty() {
        block.push_str(&settings.template);
        block.push('\n');
    }

    let system = Role::System.turn_prefix();
    if settings.default_system.is_empty() {
        block.push(COMMENT_PREFIX);
        block.push_str(&system);
    } else {
        block.push_str(&system);
        block.push_str(&settings.default_system);
    }

    block.push('\n');
    block.push_str(BLOCK_FENCE);
    block.push('\n');
    block
}

pub fn run_new_dialogue(editor: &mut dyn EditorHost, settings: &Settings) {
    editor.replace_selection(&new_dialogue_block(settings));
}
