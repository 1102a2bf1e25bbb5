use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::{CancelSignal, CompletionEvent, CompletionProvider, CompletionRequest, RequestId};

/// Callback invoked on the worker thread after each event is queued.
///
/// Hosts use it to schedule a drain on their own thread; it must not block.
pub type EventNotifier = Arc<dyn Fn(RequestId) + Send + Sync>;

/// One running completion: a cancellable, ordered sequence of events.
///
/// The provider runs on a dedicated worker thread. Events are delivered in the
/// order the provider emitted them and end with exactly one terminal event.
/// Once [`CompletionHandle::cancel`] is called no further content is delivered;
/// the sequence ends with `Cancelled`.
pub struct CompletionHandle {
    request_id: RequestId,
    cancel: CancelSignal,
    events: Receiver<CompletionEvent>,
    worker: Option<JoinHandle<()>>,
    terminated: bool,
}

impl CompletionHandle {
    /// Spawns a worker running `provider` for `request`.
    pub fn start(
        provider: Arc<dyn CompletionProvider>,
        request: CompletionRequest,
        notifier: Option<EventNotifier>,
    ) -> Result<Self, String> {
        let request_id = request.request_id;
        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, events) = mpsc::channel();
        let worker_cancel = Arc::clone(&cancel);

        let worker = thread::Builder::new()
            .name(format!("aichat-completion-{request_id}"))
            .spawn(move || {
                let mut emitter = WorkerEmitter {
                    request_id,
                    sender,
                    notifier,
                    terminal_emitted: false,
                };
                run_worker(provider, request, worker_cancel, &mut emitter);
            })
            .map_err(|error| format!("Failed to spawn completion worker: {error}"))?;

        debug!(request_id, "completion worker spawned");

        Ok(Self {
            request_id,
            cancel,
            events,
            worker: Some(worker),
            terminated: false,
        })
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Asks the transport to abort. Content arriving afterwards is discarded.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// True once the terminal event has been delivered.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Returns the next queued event without blocking.
    pub fn try_next(&mut self) -> Option<CompletionEvent> {
        while !self.terminated {
            match self.events.try_recv() {
                Ok(event) => {
                    if let Some(event) = self.admit(event) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(self.worker_vanished()),
            }
        }

        None
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<CompletionEvent> {
        while !self.terminated {
            match self.events.recv_timeout(timeout) {
                Ok(event) => {
                    if let Some(event) = self.admit(event) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return Some(self.worker_vanished()),
            }
        }

        None
    }

    fn admit(&mut self, event: CompletionEvent) -> Option<CompletionEvent> {
        let event = if self.is_cancelled() {
            match event {
                CompletionEvent::Content { is_final: false, .. }
                | CompletionEvent::Usage { .. } => return None,
                CompletionEvent::Content { request_id, .. } => {
                    CompletionEvent::Cancelled { request_id }
                }
                other => other,
            }
        } else {
            event
        };

        if event.is_terminal() {
            self.terminated = true;
            self.reap_worker();
        }

        Some(event)
    }

    fn worker_vanished(&mut self) -> CompletionEvent {
        self.terminated = true;
        self.reap_worker();
        if self.is_cancelled() {
            CompletionEvent::Cancelled {
                request_id: self.request_id,
            }
        } else {
            CompletionEvent::Failed {
                request_id: self.request_id,
                error: "Completion worker exited without terminal event".to_string(),
            }
        }
    }

    fn reap_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                let _ = worker.join();
            }
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if !self.terminated {
            self.cancel();
        }
    }
}

struct WorkerEmitter {
    request_id: RequestId,
    sender: Sender<CompletionEvent>,
    notifier: Option<EventNotifier>,
    terminal_emitted: bool,
}

impl WorkerEmitter {
    fn emit(&mut self, event: CompletionEvent) {
        if self.terminal_emitted {
            return;
        }
        if event.request_id() != self.request_id {
            warn!(
                request_id = self.request_id,
                foreign = event.request_id(),
                "provider emitted event for another request"
            );
            return;
        }

        self.terminal_emitted = event.is_terminal();
        if self.sender.send(event).is_ok() {
            if let Some(notifier) = &self.notifier {
                notifier(self.request_id);
            }
        }
    }
}

fn run_worker(
    provider: Arc<dyn CompletionProvider>,
    request: CompletionRequest,
    cancel: CancelSignal,
    emitter: &mut WorkerEmitter,
) {
    let request_id = request.request_id;
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        provider.run(request, cancel, &mut |event| emitter.emit(event))
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(error)) => emitter.emit(CompletionEvent::Failed { request_id, error }),
        Err(_) => emitter.emit(CompletionEvent::Failed {
            request_id,
            error: "Completion provider panicked".to_string(),
        }),
    }

    if !emitter.terminal_emitted {
        emitter.emit(CompletionEvent::Failed {
            request_id,
            error: "Completion provider exited without terminal event".to_string(),
        });
    }
}
