//! OpenAI chat-completions implementation of the `completion_provider` contract.
//!
//! This adapter translates `openai_api` stream deltas into the whole-answer
//! `Content` events the reconciler expects. Credentials arrive with each
//! request, so a transport client is built per run.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use completion_provider::{
    CancelSignal, CompletionEvent, CompletionProvider, CompletionRequest, ProviderInitError,
    ProviderProfile, RequestId, TokenUsage,
};
use openai_api::{
    ChatCompletion, ChatCompletionRequest, ChatMessage, ChatStreamEvent, ContentAccumulator,
    FinishReason, OpenAiApiClient, OpenAiApiConfig, OpenAiApiError, Usage,
};
use tracing::{debug, info, warn};
use transcript::{Message, SamplingOptions};
use url::Url;

/// Stable provider identifier.
pub const OPENAI_PROVIDER_ID: &str = "openai";

/// Runtime configuration for the OpenAI provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiProviderConfig {
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub timeout: Option<Duration>,
    /// Stream deltas when true; one JSON response otherwise.
    pub streaming: bool,
}

impl Default for OpenAiProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            organization: None,
            timeout: None,
            streaming: true,
        }
    }
}

impl OpenAiProviderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    fn into_api_config(self) -> Result<OpenAiApiConfig, ProviderInitError> {
        let mut config = OpenAiApiConfig::default();

        if let Some(base_url) = self.base_url {
            validate_base_url(&base_url)?;
            config = config.with_base_url(base_url);
        }

        if let Some(organization) = self.organization {
            config = config.with_organization(organization);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        Ok(config)
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ProviderInitError> {
    let parsed = Url::parse(base_url.trim()).map_err(|error| {
        ProviderInitError::new(format!("Invalid OpenAI base URL '{base_url}': {error}"))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ProviderInitError::new(format!(
            "Invalid OpenAI base URL '{base_url}': unsupported scheme '{scheme}'"
        ))),
    }
}

trait StreamClient: Send + Sync {
    fn stream(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
        on_event: &mut dyn FnMut(ChatStreamEvent),
    ) -> Result<Option<FinishReason>, OpenAiApiError>;

    fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<ChatCompletion, OpenAiApiError>;
}

#[derive(Debug)]
struct DefaultStreamClient {
    template: OpenAiApiConfig,
}

impl DefaultStreamClient {
    fn client(&self, api_key: &str) -> Result<OpenAiApiClient, OpenAiApiError> {
        let mut config = self.template.clone();
        config.api_key = api_key.to_string();
        OpenAiApiClient::new(config)
    }
}

fn current_thread_runtime() -> Result<tokio::runtime::Runtime, OpenAiApiError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            OpenAiApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
        })
}

impl StreamClient for DefaultStreamClient {
    fn stream(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
        on_event: &mut dyn FnMut(ChatStreamEvent),
    ) -> Result<Option<FinishReason>, OpenAiApiError> {
        let client = self.client(api_key)?;
        let runtime = current_thread_runtime()?;
        runtime.block_on(client.stream_with_handler(request, Some(cancel), |event| on_event(event)))
    }

    fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<ChatCompletion, OpenAiApiError> {
        let client = self.client(api_key)?;
        let runtime = current_thread_runtime()?;
        runtime.block_on(client.complete(request, Some(cancel)))
    }
}

/// `CompletionProvider` adapter backed by `openai_api` transport primitives.
pub struct OpenAiProvider {
    streaming: bool,
    stream_client: Arc<dyn StreamClient>,
}

impl OpenAiProvider {
    /// Creates a provider using real OpenAI transport.
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderInitError> {
        let streaming = config.streaming;
        let template = config.into_api_config()?;
        Ok(Self {
            streaming,
            stream_client: Arc::new(DefaultStreamClient { template }),
        })
    }

    fn run_streaming(
        &self,
        request_id: RequestId,
        api_key: &str,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
        emit: &mut dyn FnMut(CompletionEvent),
    ) {
        let mut accumulator = ContentAccumulator::default();
        let result = self
            .stream_client
            .stream(api_key, request, cancel, &mut |event| {
                if accumulator.apply(&event) && !cancel.load(Ordering::Acquire) {
                    emit(CompletionEvent::Content {
                        request_id,
                        content: accumulator.content.clone(),
                        is_final: false,
                    });
                }
            });

        match result {
            Ok(Some(reason)) => {
                if reason != FinishReason::Stop {
                    warn!(request_id, reason = reason.as_str(), "completion stopped early");
                }
                if let Some(usage) = accumulator.usage {
                    emit_usage(request_id, usage, emit);
                }
                emit(CompletionEvent::Content {
                    request_id,
                    content: accumulator.content,
                    is_final: true,
                });
            }
            Ok(None) => emit(CompletionEvent::Failed {
                request_id,
                error: "Completion stream ended without finish reason".to_string(),
            }),
            Err(error) => emit_transport_error(request_id, error, emit),
        }
    }

    fn run_one_shot(
        &self,
        request_id: RequestId,
        api_key: &str,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
        emit: &mut dyn FnMut(CompletionEvent),
    ) {
        match self.stream_client.complete(api_key, request, cancel) {
            Ok(completion) => {
                if let Some(usage) = completion.usage {
                    emit_usage(request_id, usage, emit);
                }
                emit(CompletionEvent::Content {
                    request_id,
                    content: completion.content,
                    is_final: true,
                });
            }
            Err(error) => emit_transport_error(request_id, error, emit),
        }
    }

    #[cfg(test)]
    fn with_stream_client_for_tests(streaming: bool, stream_client: Arc<dyn StreamClient>) -> Self {
        Self {
            streaming,
            stream_client,
        }
    }
}

impl CompletionProvider for OpenAiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OPENAI_PROVIDER_ID.to_string(),
            streaming: self.streaming,
        }
    }

    fn run(
        &self,
        req: CompletionRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(CompletionEvent),
    ) -> Result<(), String> {
        let request_id = req.request_id;

        emit(CompletionEvent::Started { request_id });

        if cancel.load(Ordering::Acquire) {
            emit(CompletionEvent::Cancelled { request_id });
            return Ok(());
        }

        let request = chat_request(&req.model, &req.messages, req.options);
        info!(
            request_id,
            model = %request.model,
            messages = request.messages.len(),
            streaming = self.streaming,
            "sending chat completion"
        );

        let api_key = req.credentials.token();
        if self.streaming {
            self.run_streaming(request_id, api_key, &request, &cancel, emit);
        } else {
            self.run_one_shot(request_id, api_key, &request, &cancel, emit);
        }

        Ok(())
    }
}

fn chat_request(model: &str, messages: &[Message], options: SamplingOptions) -> ChatCompletionRequest {
    let messages = messages
        .iter()
        .map(|message| ChatMessage::new(message.role.as_str(), message.content.clone()))
        .collect();

    let mut request = ChatCompletionRequest::new(model.trim(), messages);
    request.temperature = options.temperature;
    request.top_p = options.top_p;
    request.max_tokens = options.max_tokens;
    request.presence_penalty = options.presence_penalty;
    request
}

fn emit_usage(request_id: RequestId, usage: Usage, emit: &mut dyn FnMut(CompletionEvent)) {
    emit(CompletionEvent::Usage {
        request_id,
        usage: TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        },
    });
}

fn emit_transport_error(
    request_id: RequestId,
    error: OpenAiApiError,
    emit: &mut dyn FnMut(CompletionEvent),
) {
    if error.is_cancelled() {
        debug!(request_id, "chat completion cancelled by transport");
        emit(CompletionEvent::Cancelled { request_id });
        return;
    }

    warn!(request_id, error = %error, "chat completion failed");
    emit(CompletionEvent::Failed {
        request_id,
        error: format!("Completion request failed: {error}"),
    });
}
