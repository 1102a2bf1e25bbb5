//! Deterministic mock implementation of the `completion_provider` contract.
//!
//! This crate contains no transport logic and is intended for offline use and
//! contract-level integration testing of the reconciler.

use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use completion_provider::{
    CancelSignal, CompletionEvent, CompletionProvider, CompletionRequest, ProviderProfile,
    RequestId, TokenUsage,
};

/// Stable provider identifier.
pub const MOCK_PROVIDER_ID: &str = "mock";

const HOLD_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// How a mock run ends once its chunks are streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Final content event with the whole answer.
    Complete,
    /// `Failed` with the given message.
    Fail(String),
    /// Wait for cancellation, emit one late partial, then `Cancelled`.
    HoldUntilCancelled,
}

/// Deterministic provider that replays scripted chunks.
///
/// Each chunk is split into word tokens and every token yields a `Content`
/// event carrying the answer accumulated so far.
#[derive(Debug)]
pub struct MockProvider {
    chunks: Vec<String>,
    outcome: MockOutcome,
    usage: Option<TokenUsage>,
    run_delay: Duration,
    token_delay: Duration,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// Creates a mock provider with caller-provided chunks and no delays.
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            outcome: MockOutcome::Complete,
            usage: None,
            run_delay: Duration::ZERO,
            token_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: MockOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Sleeps `run_delay` after `Started` and `token_delay` after each token.
    #[must_use]
    pub fn with_delays(mut self, run_delay: Duration, token_delay: Duration) -> Self {
        self.run_delay = run_delay;
        self.token_delay = token_delay;
        self
    }

    /// Requests received so far, in arrival order.
    pub fn observed_requests(&self) -> Vec<CompletionRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    fn answer(&self) -> String {
        self.chunks.concat()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec![
            "This is a mocked answer.\n".to_string(),
            "It streams word by word so partial updates are visible.".to_string(),
        ])
        .with_delays(Duration::from_millis(200), Duration::from_millis(50))
    }
}

impl CompletionProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            streaming: true,
        }
    }

    fn run(
        &self,
        req: CompletionRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(CompletionEvent),
    ) -> Result<(), String> {
        let request_id = req.request_id;
        lock_unpoisoned(&self.requests).push(req);

        emit(CompletionEvent::Started { request_id });
        pause(self.run_delay);

        let mut answer = String::new();
        for chunk in &self.chunks {
            for token in tokens(chunk) {
                if cancel.load(Ordering::SeqCst) {
                    emit(CompletionEvent::Cancelled { request_id });
                    return Ok(());
                }

                answer.push_str(token);
                emit(partial(request_id, &answer));
                pause(self.token_delay);
            }
        }

        match &self.outcome {
            MockOutcome::Complete => {
                if cancel.load(Ordering::SeqCst) {
                    emit(CompletionEvent::Cancelled { request_id });
                    return Ok(());
                }
                if let Some(usage) = self.usage {
                    emit(CompletionEvent::Usage { request_id, usage });
                }
                emit(CompletionEvent::Content {
                    request_id,
                    content: self.answer(),
                    is_final: true,
                });
            }
            MockOutcome::Fail(error) => emit(CompletionEvent::Failed {
                request_id,
                error: error.clone(),
            }),
            MockOutcome::HoldUntilCancelled => {
                while !cancel.load(Ordering::SeqCst) {
                    thread::sleep(HOLD_POLL_INTERVAL);
                }
                answer.push_str(" (late)");
                emit(partial(request_id, &answer));
                emit(CompletionEvent::Cancelled { request_id });
            }
        }

        Ok(())
    }
}

fn partial(request_id: RequestId, answer: &str) -> CompletionEvent {
    CompletionEvent::Content {
        request_id,
        content: answer.to_string(),
        is_final: false,
    }
}

/// Splits `chunk` after each space or newline, keeping the separators.
fn tokens(chunk: &str) -> impl Iterator<Item = &str> {
    chunk
        .split_inclusive([' ', '\n'])
        .filter(|token| !token.is_empty())
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
