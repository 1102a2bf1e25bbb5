use serde::{Deserialize, Serialize};

/// Why the model stopped producing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    FunctionCall,
    Other(String),
}

impl FinishReason {
    pub fn parse(value: &str) -> Self {
        match value {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            "tool_calls" => Self::ToolCalls,
            "function_call" => Self::FunctionCall,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::ToolCalls => "tool_calls",
            Self::FunctionCall => "function_call",
            Self::Other(value) => value,
        }
    }
}

/// Token accounting returned by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Stream event emitted by the parser after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatStreamEvent {
    /// Text appended to the first choice.
    ContentDelta { delta: String },
    /// The first choice reported a finish reason.
    Finished { reason: FinishReason },
    /// Usage chunk, sent after the last choice chunk when requested.
    Usage { usage: Usage },
    /// In-band error object.
    Error {
        code: Option<String>,
        message: Option<String>,
    },
}

/// Folds stream events into the answer reconstructed so far.
#[derive(Debug, Clone, Default)]
pub struct ContentAccumulator {
    pub content: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl ContentAccumulator {
    /// Applies one event; returns true when the visible content changed.
    pub fn apply(&mut self, event: &ChatStreamEvent) -> bool {
        match event {
            ChatStreamEvent::ContentDelta { delta } => {
                self.content.push_str(delta);
                !delta.is_empty()
            }
            ChatStreamEvent::Finished { reason } => {
                self.finish_reason = Some(reason.clone());
                false
            }
            ChatStreamEvent::Usage { usage } => {
                self.usage = Some(*usage);
                false
            }
            ChatStreamEvent::Error { .. } => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }
}
