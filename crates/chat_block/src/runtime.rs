use std::sync::Arc;
use std::time::{Duration, Instant};

use completion_provider::{
    CompletionEvent, CompletionHandle, CompletionProvider, CompletionRequest, EventNotifier,
    RequestId,
};
use tracing::debug;
use transcript::LineAction;

use crate::block::BlockContext;
use crate::error::{LineActionError, SubmitError};
use crate::host::{CompletionHost, DocumentHost, StartRequest};
use crate::reconciler::{ApplyOutcome, Reconciler, RequestSettings};

const PUMP_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Starts provider runs on worker threads and hands their events back.
pub struct CompletionTransport {
    provider: Arc<dyn CompletionProvider>,
    active: Option<CompletionHandle>,
    next_request_id: RequestId,
    notifier: Option<EventNotifier>,
}

impl CompletionTransport {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            active: None,
            next_request_id: 1,
            notifier: None,
        }
    }

    /// Called from the worker thread whenever an event is queued.
    pub fn set_notifier(&mut self, notifier: EventNotifier) {
        self.notifier = Some(notifier);
    }

    /// True while the current handle has not delivered its terminal event.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| !handle.is_terminated())
    }

    fn try_next(&mut self) -> Option<CompletionEvent> {
        self.active.as_mut()?.try_next()
    }

    fn next_timeout(&mut self, timeout: Duration) -> Option<CompletionEvent> {
        self.active.as_mut()?.next_timeout(timeout)
    }
}

impl CompletionHost for CompletionTransport {
    fn start_completion(&mut self, request: StartRequest) -> Result<RequestId, String> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = CompletionRequest {
            request_id,
            model: request.model,
            messages: request.messages,
            options: request.options,
            credentials: request.credentials,
        };
        let handle = CompletionHandle::start(
            Arc::clone(&self.provider),
            request,
            self.notifier.clone(),
        )?;

        // Dropping a superseded handle cancels its worker.
        self.active = Some(handle);
        Ok(request_id)
    }

    fn cancel_completion(&mut self, request_id: RequestId) {
        if let Some(handle) = self.active.as_ref() {
            if handle.request_id() == request_id {
                handle.cancel();
            }
        }
    }
}

/// Host-thread entry point: user actions in, completion events pumped into
/// the reconciler in arrival order.
pub struct ChatController {
    reconciler: Reconciler,
    transport: CompletionTransport,
}

impl ChatController {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: RequestSettings) -> Self {
        Self {
            reconciler: Reconciler::new(settings),
            transport: CompletionTransport::new(provider),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: EventNotifier) -> Self {
        self.transport.set_notifier(notifier);
        self
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn set_settings(&mut self, settings: RequestSettings) {
        self.reconciler.set_settings(settings);
    }

    pub fn is_block_busy(&self, context: &BlockContext) -> bool {
        self.reconciler.is_block_busy(context)
    }

    pub fn submit(
        &mut self,
        docs: &mut dyn DocumentHost,
        context: &BlockContext,
        text: &str,
    ) -> Result<RequestId, SubmitError> {
        self.reconciler
            .on_submit(docs, &mut self.transport, context, text)
    }

    pub fn cancel(&mut self, docs: &mut dyn DocumentHost) -> Option<RequestId> {
        self.reconciler.on_cancel(docs, &mut self.transport)
    }

    pub fn line_action(
        &mut self,
        docs: &mut dyn DocumentHost,
        context: &BlockContext,
        line: usize,
        action: LineAction,
    ) -> Result<(), LineActionError> {
        self.reconciler.on_line_action(docs, context, line, action)
    }

    /// Applies every event already queued, without blocking.
    pub fn pump(&mut self, docs: &mut dyn DocumentHost) -> Vec<ApplyOutcome> {
        let mut outcomes = Vec::new();
        while let Some(event) = self.transport.try_next() {
            outcomes.push(self.apply(docs, event));
        }
        outcomes
    }

    /// Waits up to `timeout` for one event and applies it.
    pub fn pump_next(
        &mut self,
        docs: &mut dyn DocumentHost,
        timeout: Duration,
    ) -> Option<ApplyOutcome> {
        let event = self.transport.next_timeout(timeout)?;
        Some(self.apply(docs, event))
    }

    /// Applies events until the current completion ends or `timeout` passes.
    pub fn pump_until_idle(
        &mut self,
        docs: &mut dyn DocumentHost,
        timeout: Duration,
    ) -> Vec<ApplyOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = Vec::new();

        while self.transport.is_running() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if let Some(outcome) = self.pump_next(docs, remaining.min(PUMP_POLL_INTERVAL)) {
                outcomes.push(outcome);
            }
        }

        outcomes
    }

    fn apply(&mut self, docs: &mut dyn DocumentHost, event: CompletionEvent) -> ApplyOutcome {
        let request_id = event.request_id();
        let outcome = self.reconciler.apply_event(docs, event);
        debug!(request_id, ?outcome, "completion event applied");
        outcome
    }
}
