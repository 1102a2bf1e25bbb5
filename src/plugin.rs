use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chat_block::{
    ApplyOutcome, BlockContext, ChatController, DocumentHost, LineActionError, RequestSettings,
    SubmitError,
};
use completion_provider::{CompletionProvider, Credentials, RequestId};
use completion_provider_openai::{OpenAiProvider, OpenAiProviderConfig};
use settings_store::{plugin_data_path, Settings, SettingsStore};
use tracing::{debug, info};
use transcript::LineAction;

use crate::command::{run_new_dialogue, EditorHost};
use crate::error::PluginError;
use crate::input::{InputEvent, PromptAction, PromptInput};
use crate::render::{BlockView, CalloutHost};
use crate::settings_tab::{apply_value, SettingId, SettingValue};

/// Code block language handled by the plugin.
pub const BLOCK_LANGUAGE: &str = "aichat";
pub const PLUGIN_ID: &str = "aichat";

/// What a prompt-row event led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    Idle,
    Submitted(RequestId),
    /// Cancel pressed; carries the request that was stopped, if any.
    Cancelled(Option<RequestId>),
}

/// Completion settings derived from the stored plugin settings.
pub fn request_settings(settings: &Settings) -> RequestSettings {
    RequestSettings {
        model: settings.model.clone(),
        credentials: Credentials::new(settings.token.clone()),
        show_consumed_tokens: settings.show_consumed_tokens,
    }
}

/// One plugin instance: persisted settings plus the single chat controller
/// shared by every `aichat` block.
pub struct AichatPlugin {
    store: SettingsStore,
    controller: ChatController,
}

impl AichatPlugin {
    /// Loads settings from the vault and connects to the OpenAI API.
    pub fn open(vault_root: &Path) -> Result<Self, PluginError> {
        let store = SettingsStore::open(&plugin_data_path(vault_root, PLUGIN_ID))?;
        let provider = OpenAiProvider::new(OpenAiProviderConfig::default())?;
        Ok(Self::with_provider(store, Arc::new(provider)))
    }

    pub fn with_provider(store: SettingsStore, provider: Arc<dyn CompletionProvider>) -> Self {
        let controller = ChatController::new(provider, request_settings(store.settings()));
        info!(path = %store.path().display(), "aichat plugin loaded");
        Self { store, controller }
    }

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    /// Applies one settings panel edit and persists it.
    ///
    /// Requests started afterwards use the new model and token.
    pub fn update_setting(&mut self, id: SettingId, value: SettingValue) -> Result<(), PluginError> {
        let mut next = self.store.settings().clone();
        apply_value(&mut next, id, value)?;
        let settings = self.store.update(|settings| *settings = next)?;
        self.controller.set_settings(request_settings(settings));
        debug!(setting = ?id, "setting updated");
        Ok(())
    }

    pub fn render_block(&self, context: &BlockContext) -> BlockView {
        BlockView::new(context, self.controller.is_block_busy(context))
    }

    /// Routes a prompt-row event to submit or cancel.
    pub fn handle_input(
        &mut self,
        docs: &mut dyn DocumentHost,
        context: &BlockContext,
        input: &mut PromptInput,
        event: InputEvent,
    ) -> Result<InputOutcome, SubmitError> {
        match input.handle(event) {
            None => Ok(InputOutcome::Idle),
            Some(PromptAction::Submit(text)) => self
                .submit(docs, context, &text)
                .map(InputOutcome::Submitted),
            Some(PromptAction::Cancel) => Ok(InputOutcome::Cancelled(self.cancel(docs))),
        }
    }

    pub fn submit(
        &mut self,
        docs: &mut dyn DocumentHost,
        context: &BlockContext,
        text: &str,
    ) -> Result<RequestId, SubmitError> {
        let mut docs = CalloutHost::new(docs);
        self.controller.submit(&mut docs, context, text)
    }

    pub fn cancel(&mut self, docs: &mut dyn DocumentHost) -> Option<RequestId> {
        let mut docs = CalloutHost::new(docs);
        self.controller.cancel(&mut docs)
    }

    pub fn line_action(
        &mut self,
        docs: &mut dyn DocumentHost,
        context: &BlockContext,
        line: usize,
        action: LineAction,
    ) -> Result<(), LineActionError> {
        let mut docs = CalloutHost::new(docs);
        self.controller.line_action(&mut docs, context, line, action)
    }

    /// Applies queued completion events without blocking.
    pub fn pump(&mut self, docs: &mut dyn DocumentHost) -> Vec<ApplyOutcome> {
        let mut docs = CalloutHost::new(docs);
        self.controller.pump(&mut docs)
    }

    pub fn pump_until_idle(
        &mut self,
        docs: &mut dyn DocumentHost,
        timeout: Duration,
    ) -> Vec<ApplyOutcome> {
        let mut docs = CalloutHost::new(docs);
        self.controller.pump_until_idle(&mut docs, timeout)
    }

    /// Runs the "New dialogue" command against the active editor.
    pub fn new_dialogue(&self, editor: &mut dyn EditorHost) {
        run_new_dialogue(editor, self.store.settings());
    }
}
