//! Transport-only OpenAI chat-completions client primitives.
//!
//! This crate owns request building, SSE parsing and error mapping for the
//! `/chat/completions` endpoint. It knows nothing about transcripts, documents
//! or provider lifecycles; callers translate its events into their own model.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, OpenAiApiClient, StreamResult};
pub use config::OpenAiApiConfig;
pub use error::OpenAiApiError;
pub use events::{ChatStreamEvent, ContentAccumulator, FinishReason, Usage};
pub use payload::{
    parse_completion_response, ChatCompletion, ChatCompletionRequest, ChatMessage, StreamOptions,
};
pub use sse::SseStreamParser;
pub use url::normalize_chat_completions_url;
