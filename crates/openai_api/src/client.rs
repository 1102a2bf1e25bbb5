use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::OpenAiApiConfig;
use crate::error::{parse_error_message, OpenAiApiError};
use crate::events::{ChatStreamEvent, FinishReason};
use crate::headers::build_headers;
use crate::payload::{parse_completion_response, ChatCompletion, ChatCompletionRequest, StreamOptions};
use crate::sse::SseStreamParser;
use crate::url::normalize_chat_completions_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct OpenAiApiClient {
    http: Client,
    config: OpenAiApiConfig,
}

#[derive(Debug, Clone)]
pub struct StreamResult {
    pub events: Vec<ChatStreamEvent>,
    pub finish_reason: Option<FinishReason>,
}

impl OpenAiApiClient {
    pub fn new(config: OpenAiApiConfig) -> Result<Self, OpenAiApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OpenAiApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiApiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        normalize_chat_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self, streaming: bool) -> Result<HeaderMap, OpenAiApiError> {
        let headers = build_headers(&self.config, streaming)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| OpenAiApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| OpenAiApiError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    /// Builds the POST for `request`, forcing the transport fields for the
    /// selected mode.
    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
        streaming: bool,
    ) -> Result<reqwest::RequestBuilder, OpenAiApiError> {
        validate_request_payload_shape(request)?;

        let headers = self.build_headers(streaming)?;
        let payload = request_with_transport_defaults(request, streaming);
        Ok(self
            .http
            .post(self.endpoint())
            .headers(headers)
            .json(&payload))
    }

    /// Sends once. Non-success statuses are read and mapped to
    /// [`OpenAiApiError::Status`]; nothing is retried.
    pub async fn send(
        &self,
        request: &ChatCompletionRequest,
        streaming: bool,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, OpenAiApiError> {
        if is_cancelled(cancellation) {
            return Err(OpenAiApiError::Cancelled);
        }

        let response = self.build_request(request, streaming)?.send();
        let response = await_or_cancel(response, cancellation)
            .await?
            .map_err(OpenAiApiError::from)?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, streaming, "chat completion response accepted");
            return Ok(response);
        }

        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .unwrap_or_default();
        let message = parse_error_message(status, &body);
        warn!(%status, error = %message, "chat completion request rejected");
        Err(OpenAiApiError::Status(status, message))
    }

    /// Streams the response, handing each normalized event to `on_event`.
    ///
    /// Returns the finish reason of the first choice, or `None` when the
    /// stream ended without one. In-band error objects fail the stream.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<Option<FinishReason>, OpenAiApiError>
    where
        F: FnMut(ChatStreamEvent),
    {
        let response = self.send(request, true, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut parser = SseStreamParser::default();
        let mut finish_reason = None;

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(OpenAiApiError::Cancelled);
            }
            let chunk = chunk.map_err(OpenAiApiError::from)?;
            for event in parser.feed(&chunk) {
                process_stream_event(event, &mut finish_reason, &mut on_event)?;
            }
        }

        if is_cancelled(cancellation) {
            return Err(OpenAiApiError::Cancelled);
        }

        Ok(finish_reason)
    }

    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, OpenAiApiError> {
        let mut events = Vec::new();
        let finish_reason = self
            .stream_with_handler(request, cancellation, |event| {
                events.push(event);
            })
            .await?;

        Ok(StreamResult {
            events,
            finish_reason,
        })
    }

    /// One-shot request: a single JSON response with the first choice.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatCompletion, OpenAiApiError> {
        let response = self.send(request, false, cancellation).await?;
        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .map_err(OpenAiApiError::from)?;
        parse_completion_response(&body)
    }
}

fn request_with_transport_defaults(
    request: &ChatCompletionRequest,
    streaming: bool,
) -> ChatCompletionRequest {
    let mut payload = request.clone();
    payload.stream = streaming;
    payload.stream_options = streaming.then_some(StreamOptions {
        include_usage: true,
    });
    payload
}

fn validate_request_payload_shape(request: &ChatCompletionRequest) -> Result<(), OpenAiApiError> {
    if request.model.trim().is_empty() {
        return Err(OpenAiApiError::InvalidRequestPayload(
            "'model' must not be empty".to_owned(),
        ));
    }
    if request.messages.is_empty() {
        return Err(OpenAiApiError::InvalidRequestPayload(
            "'messages' must contain at least one message".to_owned(),
        ));
    }
    Ok(())
}

fn process_stream_event<F>(
    event: ChatStreamEvent,
    finish_reason: &mut Option<FinishReason>,
    on_event: &mut F,
) -> Result<(), OpenAiApiError>
where
    F: FnMut(ChatStreamEvent),
{
    if let ChatStreamEvent::Error { code, message } = &event {
        return Err(OpenAiApiError::StreamFailed {
            code: code.clone(),
            message: message
                .clone()
                .or_else(|| code.clone())
                .unwrap_or_else(|| "unknown stream error".to_owned()),
        });
    }

    if let ChatStreamEvent::Finished { reason } = &event {
        *finish_reason = Some(reason.clone());
    }

    on_event(event);
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, OpenAiApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(OpenAiApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(OpenAiApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
