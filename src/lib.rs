//! `aichat` code blocks: chat transcripts inside markdown notes.
//!
//! [`AichatPlugin`] is the facade an embedding note application drives. It
//! renders `aichat` blocks as callouts with a prompt row, routes prompt
//! events to the chat controller, applies streamed completions to the live
//! note and exposes the "New dialogue" command and the settings panel model.
//!
//! The host supplies documents, rendering and notices through
//! [`chat_block::DocumentHost`] and the active editor through [`EditorHost`].

pub mod command;
pub mod error;
pub mod input;
pub mod plugin;
pub mod render;
pub mod settings_tab;

pub use command::{
    new_dialogue_block, run_new_dialogue, CommandSpec, EditorHost, BLOCK_FENCE, COMMANDS,
    NEW_DIALOGUE_COMMAND_ID, NEW_DIALOGUE_COMMAND_NAME,
};
pub use error::PluginError;
pub use input::{InputEvent, PromptAction, PromptInput, SUBMIT_KEY};
pub use plugin::{request_settings, AichatPlugin, InputOutcome, BLOCK_LANGUAGE, PLUGIN_ID};
pub use render::{
    render_source, BlockView, CalloutHost, CALLOUT_HEADER, CANCEL_LABEL, SUBMIT_LABEL, USER_LABEL,
};
pub use settings_tab::{
    apply_value, current_value, setting_field, settings_fields, FieldKind, SettingField,
    SettingId, SettingValue,
};

pub use chat_block::{BlockContext, BlockSection, DocumentError, DocumentHost};
pub use settings_store::Settings;
pub use transcript::LineAction;
