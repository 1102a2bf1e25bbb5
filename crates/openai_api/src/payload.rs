use serde::{Deserialize, Serialize};

use crate::error::OpenAiApiError;
use crate::events::{FinishReason, Usage};

/// One chat message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request body for the chat-completions endpoint.
///
/// Sampling fields are omitted from the JSON when unset so server defaults
/// apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            stream_options: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            presence_penalty: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}

/// Non-streaming response body. Only the fields this client reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseChoice {
    pub message: Option<ResponseMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Result of a one-shot completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// First choice's message content; `None` when there are no choices.
    pub(crate) fn into_completion(self) -> Option<ChatCompletion> {
        let usage = self.usage;
        let choice = self.choices.into_iter().next()?;
        Some(ChatCompletion {
            content: choice
                .message
                .and_then(|message| message.content)
                .unwrap_or_default(),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
            usage,
        })
    }
}

/// Parse a non-streaming response body into its first choice.
pub fn parse_completion_response(body: &str) -> Result<ChatCompletion, OpenAiApiError> {
    serde_json::from_str::<ChatCompletionResponse>(body)?
        .into_completion()
        .ok_or(OpenAiApiError::EmptyResponse)
}
