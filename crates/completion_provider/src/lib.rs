//! Provider-agnostic contract for one streamed chat completion.
//!
//! This crate defines the request, the ordered event sequence a provider
//! emits, and [`CompletionHandle`], which runs a provider off the host thread
//! and hands its events back in order. It excludes transport details and any
//! knowledge of documents; single-flight enforcement belongs to the caller.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use transcript::{Message, SamplingOptions};

mod handle;

pub use handle::{CompletionHandle, EventNotifier};

/// Identifier for one completion request.
pub type RequestId = u64;

/// Shared cancellation flag for a request.
pub type CancelSignal = Arc<AtomicBool>;

/// Error returned while constructing/configuring a provider before any request starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Bearer credentials passed with each request.
///
/// An empty token is accepted here; transports reject it when the request is
/// sent, so the failure is reported like any other transport error.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Credentials").field("token", &token).finish()
    }
}

/// Input required to start a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub request_id: RequestId,
    pub model: String,
    pub messages: Vec<Message>,
    pub options: SamplingOptions,
    pub credentials: Credentials,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Provider-emitted lifecycle event for a request.
///
/// `Content` carries the whole answer reconstructed so far, not a delta.
/// Exactly one terminal event ends a request: a `Content` with
/// `is_final = true`, `Failed`, or `Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    Started {
        request_id: RequestId,
    },
    Content {
        request_id: RequestId,
        content: String,
        is_final: bool,
    },
    Usage {
        request_id: RequestId,
        usage: TokenUsage,
    },
    Failed {
        request_id: RequestId,
        error: String,
    },
    Cancelled {
        request_id: RequestId,
    },
}

impl CompletionEvent {
    /// Returns the request identifier associated with this event.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Started { request_id }
            | Self::Content { request_id, .. }
            | Self::Usage { request_id, .. }
            | Self::Failed { request_id, .. }
            | Self::Cancelled { request_id } => *request_id,
        }
    }

    /// Returns true when this event terminates the request lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Content { is_final: true, .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}

/// Immutable metadata describing a completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub streaming: bool,
}

/// Provider interface for executing one completion request.
pub trait CompletionProvider: Send + Sync + 'static {
    /// Returns provider identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Executes a request and emits lifecycle events in provider order.
    ///
    /// Implementations should poll `cancel` between transport reads and emit
    /// `Cancelled` once they observe it.
    fn run(
        &self,
        req: CompletionRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(CompletionEvent),
    ) -> Result<(), String>;
}

#[cfg(test)]
mod tests {
    use transcript::Message;

    use super::{
        CancelSignal, CompletionEvent, CompletionProvider, CompletionRequest, Credentials,
        ProviderInitError, ProviderProfile, TokenUsage,
    };

    struct MinimalProvider;

    impl CompletionProvider for MinimalProvider {
        fn profile(&self) -> ProviderProfile {
            ProviderProfile {
                provider_id: "minimal".to_string(),
                streaming: false,
            }
        }

        fn run(
            &self,
            req: CompletionRequest,
            _cancel: CancelSignal,
            emit: &mut dyn FnMut(CompletionEvent),
        ) -> Result<(), String> {
            emit(CompletionEvent::Started {
                request_id: req.request_id,
            });
            emit(CompletionEvent::Content {
                request_id: req.request_id,
                content: String::new(),
                is_final: true,
            });
            Ok(())
        }
    }

    #[test]
    fn event_request_id_returns_event_request_id() {
        let request_id = 42;
        let events = [
            CompletionEvent::Started { request_id },
            CompletionEvent::Content {
                request_id,
                content: "partial".to_string(),
                is_final: false,
            },
            CompletionEvent::Usage {
                request_id,
                usage: TokenUsage::default(),
            },
            CompletionEvent::Failed {
                request_id,
                error: "failure".to_string(),
            },
            CompletionEvent::Cancelled { request_id },
        ];

        for event in events {
            assert_eq!(event.request_id(), request_id);
        }
    }

    #[test]
    fn terminal_detection_matches_lifecycle() {
        assert!(!CompletionEvent::Started { request_id: 1 }.is_terminal());
        assert!(!CompletionEvent::Content {
            request_id: 1,
            content: "hel".to_string(),
            is_final: false,
        }
        .is_terminal());
        assert!(!CompletionEvent::Usage {
            request_id: 1,
            usage: TokenUsage::default(),
        }
        .is_terminal());
        assert!(CompletionEvent::Content {
            request_id: 1,
            content: "hello".to_string(),
            is_final: true,
        }
        .is_terminal());
        assert!(CompletionEvent::Failed {
            request_id: 1,
            error: "boom".to_string(),
        }
        .is_terminal());
        assert!(CompletionEvent::Cancelled { request_id: 1 }.is_terminal());
    }

    #[test]
    fn provider_init_error_preserves_message() {
        let error = ProviderInitError::new("invalid base url");
        assert_eq!(error.message(), "invalid base url");
        assert_eq!(error.to_string(), "invalid base url");
    }

    #[test]
    fn credentials_debug_never_prints_token() {
        let credentials = Credentials::new("sk-secret");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
        assert!(Credentials::new("   ").is_empty());
    }

    #[test]
    fn minimal_provider_finishes_with_single_terminal_event() {
        let mut events = Vec::new();
        MinimalProvider
            .run(
                CompletionRequest {
                    request_id: 3,
                    model: "m".to_string(),
                    messages: vec![Message::user("hi")],
                    options: Default::default(),
                    credentials: Credentials::default(),
                },
                Default::default(),
                &mut |event| events.push(event),
            )
            .expect("minimal run should succeed");

        assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
        assert!(matches!(
            events.last(),
            Some(CompletionEvent::Content { is_final: true, .. })
        ));
    }
}
