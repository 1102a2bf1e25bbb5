//! Prompt row under a rendered block: a text area plus submit and cancel.

/// Key id that submits the prompt.
pub const SUBMIT_KEY: &str = "shift+enter";

/// Event delivered by the host view to the prompt row.
///
/// `key_id` follows the `modifier+key` naming used for keybindings, e.g.
/// `shift+enter` or `backspace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Text { text: String },
    Paste { text: String },
    Key { key_id: String, is_composing: bool },
    SubmitClicked,
    CancelClicked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAction {
    Submit(String),
    Cancel,
}

/// Text area state for one rendered block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptInput {
    value: String,
}

impl PromptInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Applies `event`, returning the action it triggers.
    ///
    /// Shift+Enter submits and clears the text area; it is ignored while an
    /// IME composition is active. The submit button keeps the text.
    pub fn handle(&mut self, event: InputEvent) -> Option<PromptAction> {
        match event {
            InputEvent::Text { text } | InputEvent::Paste { text } => {
                self.value.push_str(&text);
                None
            }
            InputEvent::Key {
                key_id,
                is_composing,
            } => self.handle_key(&key_id, is_composing),
            InputEvent::SubmitClicked => Some(PromptAction::Submit(self.value.clone())),
            InputEvent::CancelClicked => Some(PromptAction::Cancel),
        }
    }

    fn handle_key(&mut self, key_id: &str, is_composing: bool) -> Option<PromptAction> {
        if is_composing {
            return None;
        }

        match key_id {
            SUBMIT_KEY => Some(PromptAction::Submit(std::mem::take(&mut self.value))),
            "enter" => {
                self.value.push('\n');
                None
            }
            "backspace" => {
                self.value.pop();
                None
            }
            _ => None,
        }
    }
}
