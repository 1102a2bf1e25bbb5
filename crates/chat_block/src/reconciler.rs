//! Single-flight state machine that splices a streamed answer into a live
//! document.
//!
//! Every document rewrite is scoped to the marked region owned by the active
//! request's anchor. When that region can no longer be found (the user edited
//! it away) the rewrite is dropped and reported as [`ApplyOutcome::Conflict`];
//! the rest of the document is never touched.

use std::time::Duration;

use completion_provider::{CompletionEvent, Credentials, RequestId, TokenUsage};
use tracing::{debug, info, warn};
use transcript::{
    clear_between_marks, finalize_between_marks, find_response_region, has_pending_response,
    parse, replace_between_marks, LineAction, RequestAnchor,
};

use crate::block::{
    block_body, compose_submission, rewrite_block_line, splice_block_body, verify_block,
};
use crate::block::{BlockContext, BlockSection};
use crate::error::{
    DocumentError, LineActionError, SubmitError, ValidationError, BLOCK_CHANGED_NOTICE,
    MISSING_FILE_NOTICE,
};
use crate::host::{CompletionHost, DocumentHost, StartRequest};

const IN_PROGRESS_NOTICE_TIMEOUT: Duration = Duration::from_millis(5000);
const MISSING_FILE_NOTICE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Prefix of the text written in place of an answer when the request fails.
pub const ERROR_TEXT_PREFIX: &str = "Something has been occurred: ";

/// Where the reconciler is in the lifecycle of the single in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingSubmission,
    Streaming { request_id: RequestId },
}

/// How the last request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finalized,
    Errored,
    Cancelled,
}

/// Result of applying one completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The event belongs to a request that is no longer in flight.
    Stale,
    /// The marked region was missing, so the document was left alone.
    Conflict,
}

/// Settings read on every submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSettings {
    pub model: String,
    pub credentials: Credentials,
    pub show_consumed_tokens: bool,
}

/// The request currently owning a marked region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightRequest {
    pub request_id: RequestId,
    pub anchor: RequestAnchor,
    pub source_path: String,
    pub section: BlockSection,
    /// Last known block body, kept in step with every partial update.
    pub block_text: String,
    pub usage: Option<TokenUsage>,
}

/// Holds at most one [`InFlightRequest`].
#[derive(Debug, Default)]
pub struct InFlightSlot {
    current: Option<InFlightRequest>,
}

impl InFlightSlot {
    pub fn acquire(&mut self, request: InFlightRequest) -> Result<(), ValidationError> {
        if let Some(active) = &self.current {
            return Err(ValidationError::RequestInProgress {
                request_id: active.request_id,
            });
        }

        self.current = Some(request);
        Ok(())
    }

    /// Empties the slot if it holds `request_id`.
    pub fn release(&mut self, request_id: RequestId) -> Option<InFlightRequest> {
        if self.active_request_id() != Some(request_id) {
            return None;
        }
        self.current.take()
    }

    #[must_use]
    pub fn get(&self) -> Option<&InFlightRequest> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn active_request_id(&self) -> Option<RequestId> {
        self.current.as_ref().map(|active| active.request_id)
    }

    fn get_mut(&mut self, request_id: RequestId) -> Option<&mut InFlightRequest> {
        self.current
            .as_mut()
            .filter(|active| active.request_id == request_id)
    }
}

#[derive(Debug)]
pub struct Reconciler {
    phase: Phase,
    slot: InFlightSlot,
    last_outcome: Option<Outcome>,
    settings: RequestSettings,
}

impl Reconciler {
    pub fn new(settings: RequestSettings) -> Self {
        Self {
            phase: Phase::Idle,
            slot: InFlightSlot::default(),
            last_outcome: None,
            settings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn in_flight(&self) -> Option<&InFlightRequest> {
        self.slot.get()
    }

    pub fn settings(&self) -> &RequestSettings {
        &self.settings
    }

    /// Applies to the next submit; a request already in flight keeps the
    /// settings it started with, except for the token usage display.
    pub fn set_settings(&mut self, settings: RequestSettings) {
        self.settings = settings;
    }

    /// True when the in-flight request was submitted from `context`'s block,
    /// or the block text still carries a pending answer.
    pub fn is_block_busy(&self, context: &BlockContext) -> bool {
        if has_pending_response(&context.source) {
            return true;
        }

        self.slot.get().is_some_and(|active| {
            active.source_path == context.source_path
                && active.section.line_start == context.section.line_start
        })
    }

    pub fn owns_request(&self, request_id: RequestId) -> bool {
        self.slot.active_request_id() == Some(request_id)
    }

    /// Appends `text` as a user turn plus a pending answer to the block and
    /// starts a completion for the resulting transcript.
    pub fn on_submit(
        &mut self,
        docs: &mut dyn DocumentHost,
        completions: &mut dyn CompletionHost,
        context: &BlockContext,
        text: &str,
    ) -> Result<RequestId, SubmitError> {
        let text = text.trim();
        if let Err(error) = self.validate_submit(context, text) {
            let timeout = match error {
                ValidationError::EmptyInput => None,
                _ => Some(IN_PROGRESS_NOTICE_TIMEOUT),
            };
            docs.notice(&error.to_string(), timeout);
            return Err(error.into());
        }

        self.phase = Phase::AwaitingSubmission;
        let path = context.source_path.as_str();
        let anchor = RequestAnchor::generate();
        let body = compose_submission(&context.source, text, &anchor);

        let section = match write_submission(docs, path, context, &body) {
            Ok(section) => section,
            Err(error) => {
                self.phase = Phase::Idle;
                match &error {
                    SubmitError::Document(DocumentError::NotFound { .. }) => {
                        docs.notice(MISSING_FILE_NOTICE, Some(MISSING_FILE_NOTICE_TIMEOUT));
                    }
                    SubmitError::Validation(validation) => {
                        docs.notice(&validation.to_string(), Some(IN_PROGRESS_NOTICE_TIMEOUT));
                    }
                    SubmitError::Document(DocumentError::BlockChanged { .. }) => {
                        warn!(path, "block moved since it was rendered; submission dropped");
                        docs.notice(BLOCK_CHANGED_NOTICE, Some(IN_PROGRESS_NOTICE_TIMEOUT));
                    }
                    _ => warn!(path, error = %error, "failed to write submission"),
                }
                return Err(error);
            }
        };
        docs.notify_changed(path);

        let transcript = parse(&body);
        let request = StartRequest {
            model: self.settings.model.clone(),
            credentials: self.settings.credentials.clone(),
            messages: transcript.messages,
            options: transcript.options,
        };

        let request_id = match completions.start_completion(request) {
            Ok(request_id) => request_id,
            Err(error) => {
                warn!(path, error = %error, "failed to start completion");
                let message = error_text(&error);
                rewrite_region(docs, path, &anchor, &mut |doc| {
                    finalize_between_marks(doc, &message, Some(&anchor))
                });
                docs.notice(&message, None);
                self.finish(Outcome::Errored);
                return Err(SubmitError::Start(error));
            }
        };

        self.slot.acquire(InFlightRequest {
            request_id,
            anchor: anchor.clone(),
            source_path: path.to_string(),
            section,
            block_text: body.clone(),
            usage: None,
        })?;
        self.phase = Phase::Streaming { request_id };
        info!(request_id, path, "completion started");

        docs.render(&body, &anchor, path);
        Ok(request_id)
    }

    /// Aborts the in-flight request and removes its marked region.
    pub fn on_cancel(
        &mut self,
        docs: &mut dyn DocumentHost,
        completions: &mut dyn CompletionHost,
    ) -> Option<RequestId> {
        let request_id = self.slot.active_request_id()?;
        completions.cancel_completion(request_id);

        if let Some(active) = self.slot.release(request_id) {
            clear_region(docs, &active);
        }
        self.finish(Outcome::Cancelled);
        info!(request_id, "completion cancelled by user");
        Some(request_id)
    }

    /// Toggles or blanks one body line of a block no request is targeting.
    pub fn on_line_action(
        &mut self,
        docs: &mut dyn DocumentHost,
        context: &BlockContext,
        line: usize,
        action: LineAction,
    ) -> Result<(), LineActionError> {
        if self.is_block_busy(context) {
            let error = ValidationError::BlockBusy;
            docs.notice(&error.to_string(), Some(IN_PROGRESS_NOTICE_TIMEOUT));
            return Err(error.into());
        }

        let path = context.source_path.as_str();
        let mut failure = None;
        docs.mutate_document(path, &mut |doc| {
            let rewritten = verify_block(doc, context.section, &context.source)
                .map_err(LineActionError::from)
                .and_then(|()| rewrite_block_line(doc, context.section, line, action));
            match rewritten {
                Ok(rewritten) => rewritten,
                Err(error) => {
                    failure = Some(error);
                    doc.to_string()
                }
            }
        })?;
        if let Some(error) = failure {
            if matches!(error, LineActionError::Document(DocumentError::BlockChanged { .. })) {
                docs.notice(BLOCK_CHANGED_NOTICE, Some(IN_PROGRESS_NOTICE_TIMEOUT));
            }
            return Err(error);
        }

        debug!(path, line, ?action, "line action applied");
        docs.notify_changed(path);
        Ok(())
    }

    /// Applies one completion event; events of any other request are stale.
    pub fn apply_event(
        &mut self,
        docs: &mut dyn DocumentHost,
        event: CompletionEvent,
    ) -> ApplyOutcome {
        let request_id = event.request_id();
        if !self.owns_request(request_id) {
            debug!(request_id, "dropping event for stale request");
            return ApplyOutcome::Stale;
        }

        match event {
            CompletionEvent::Started { .. } => {
                debug!(request_id, "completion accepted by provider");
                ApplyOutcome::Applied
            }
            CompletionEvent::Usage { usage, .. } => {
                if let Some(active) = self.slot.get_mut(request_id) {
                    active.usage = Some(usage);
                }
                ApplyOutcome::Applied
            }
            CompletionEvent::Content {
                content,
                is_final: false,
                ..
            } => self.apply_partial(docs, request_id, &content),
            CompletionEvent::Content {
                content,
                is_final: true,
                ..
            } => self.apply_final(docs, request_id, content),
            CompletionEvent::Failed { error, .. } => self.apply_failure(docs, request_id, &error),
            CompletionEvent::Cancelled { .. } => {
                let Some(active) = self.slot.release(request_id) else {
                    return ApplyOutcome::Stale;
                };
                let outcome = clear_region(docs, &active);
                self.finish(Outcome::Cancelled);
                info!(request_id, "completion cancelled");
                outcome
            }
        }
    }

    fn validate_submit(&self, context: &BlockContext, text: &str) -> Result<(), ValidationError> {
        if text.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        if let Some(request_id) = self.slot.active_request_id() {
            return Err(ValidationError::RequestInProgress { request_id });
        }
        if has_pending_response(&context.source) {
            return Err(ValidationError::BlockBusy);
        }
        Ok(())
    }

    fn apply_partial(
        &mut self,
        docs: &mut dyn DocumentHost,
        request_id: RequestId,
        content: &str,
    ) -> ApplyOutcome {
        let Some(active) = self.slot.get_mut(request_id) else {
            return ApplyOutcome::Stale;
        };

        let anchor = active.anchor.clone();
        let outcome = rewrite_region(docs, &active.source_path, &anchor, &mut |doc| {
            replace_between_marks(doc, content, Some(&anchor))
        });
        if outcome != ApplyOutcome::Applied {
            return outcome;
        }

        active.block_text = replace_between_marks(&active.block_text, content, Some(&anchor));
        docs.render(&active.block_text, &anchor, &active.source_path);
        ApplyOutcome::Applied
    }

    fn apply_final(
        &mut self,
        docs: &mut dyn DocumentHost,
        request_id: RequestId,
        mut content: String,
    ) -> ApplyOutcome {
        let Some(active) = self.slot.release(request_id) else {
            return ApplyOutcome::Stale;
        };

        if self.settings.show_consumed_tokens {
            if let Some(usage) = active.usage {
                content.push_str(&usage_footer(usage));
            }
        }

        let anchor = &active.anchor;
        let outcome = rewrite_region(docs, &active.source_path, anchor, &mut |doc| {
            finalize_between_marks(doc, &content, Some(anchor))
        });
        self.finish(Outcome::Finalized);
        info!(request_id, path = %active.source_path, "completion finalized");
        outcome
    }

    fn apply_failure(
        &mut self,
        docs: &mut dyn DocumentHost,
        request_id: RequestId,
        error: &str,
    ) -> ApplyOutcome {
        let Some(active) = self.slot.release(request_id) else {
            return ApplyOutcome::Stale;
        };

        warn!(request_id, error, "completion failed");
        let message = error_text(error);
        let anchor = &active.anchor;
        let outcome = rewrite_region(docs, &active.source_path, anchor, &mut |doc| {
            finalize_between_marks(doc, &message, Some(anchor))
        });
        docs.notice(&message, None);
        self.finish(Outcome::Errored);
        outcome
    }

    fn finish(&mut self, outcome: Outcome) {
        self.phase = Phase::Idle;
        self.last_outcome = Some(outcome);
    }
}

/// Text written in place of the answer when a request fails.
pub fn error_text(error: &str) -> String {
    format!("{ERROR_TEXT_PREFIX}{error}")
}

/// Line appended to a finished answer when token usage display is on.
pub fn usage_footer(usage: TokenUsage) -> String {
    format!("\n<small>consumed tokens: {}</small>", usage.total_tokens)
}

fn write_submission(
    docs: &mut dyn DocumentHost,
    path: &str,
    context: &BlockContext,
    body: &str,
) -> Result<BlockSection, SubmitError> {
    let section = context.section;
    let mut result: Result<BlockSection, SubmitError> =
        Err(DocumentError::Host("document host skipped the update".to_string()).into());
    docs.mutate_document(path, &mut |doc| {
        // The rendered source can lag behind the file; re-check the live block.
        match block_body(doc, section) {
            Ok(current) if has_pending_response(&current) => {
                result = Err(ValidationError::BlockBusy.into());
                return doc.to_string();
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error.into());
                return doc.to_string();
            }
        }
        if let Err(error) = verify_block(doc, section, &context.source) {
            result = Err(error.into());
            return doc.to_string();
        }

        match splice_block_body(doc, section, body) {
            Ok((spliced, moved)) => {
                result = Ok(moved);
                spliced
            }
            Err(error) => {
                result = Err(error.into());
                doc.to_string()
            }
        }
    })?;
    result
}

fn rewrite_region(
    docs: &mut dyn DocumentHost,
    path: &str,
    anchor: &RequestAnchor,
    rewrite: &mut dyn FnMut(&str) -> String,
) -> ApplyOutcome {
    let mut located = false;
    let written = docs.mutate_document(path, &mut |doc| {
        located = find_response_region(doc, Some(anchor)).is_some();
        if located {
            rewrite(doc)
        } else {
            doc.to_string()
        }
    });

    match written {
        Ok(()) if located => {
            docs.notify_changed(path);
            ApplyOutcome::Applied
        }
        Ok(()) => {
            warn!(path, anchor = %anchor, "response markers missing, update dropped");
            ApplyOutcome::Conflict
        }
        Err(error) => {
            warn!(path, error = %error, "document rejected update");
            ApplyOutcome::Conflict
        }
    }
}

fn clear_region(docs: &mut dyn DocumentHost, active: &InFlightRequest) -> ApplyOutcome {
    let anchor = &active.anchor;
    rewrite_region(docs, &active.source_path, anchor, &mut |doc| {
        clear_between_marks(doc, Some(anchor))
    })
}

#[cfg(test)]
mod tests {
    use completion_provider::TokenUsage;
    use transcript::RequestAnchor;

    use super::{error_text, usage_footer, InFlightRequest, InFlightSlot};
    use crate::block::BlockSection;
    use crate::error::ValidationError;

    fn request(request_id: u64) -> InFlightRequest {
        InFlightRequest {
            request_id,
            anchor: RequestAnchor::generate(),
            source_path: "note.md".to_string(),
            section: BlockSection::new(0, 2),
            block_text: String::new(),
            usage: None,
        }
    }

    #[test]
    fn slot_admits_one_request_at_a_time() {
        let mut slot = InFlightSlot::default();
        slot.acquire(request(1)).expect("first acquire");

        assert_eq!(
            slot.acquire(request(2)),
            Err(ValidationError::RequestInProgress { request_id: 1 })
        );
        assert_eq!(slot.active_request_id(), Some(1));
    }

    #[test]
    fn release_ignores_other_request_ids() {
        let mut slot = InFlightSlot::default();
        slot.acquire(request(1)).expect("acquire");

        assert!(slot.release(7).is_none());
        assert_eq!(slot.release(1).map(|active| active.request_id), Some(1));
        assert!(slot.get().is_none());
        slot.acquire(request(2)).expect("slot is free again");
    }

    #[test]
    fn error_and_usage_text() {
        assert_eq!(error_text("boom"), "Something has been occurred: boom");
        assert_eq!(
            usage_footer(TokenUsage {
                prompt_tokens: 3,
                completion_tokens: 4,
                total_tokens: 7,
            }),
            "\n<small>consumed tokens: 7</small>"
        );
    }
}
