//! Reconciles one streamed completion with a dialogue block in a live
//! document.
//!
//! The embedding application implements [`DocumentHost`] (document store,
//! renderer, notices). [`ChatController`] runs completions off-thread via
//! [`completion_provider::CompletionHandle`] and applies their events on the
//! caller's thread through the [`Reconciler`], which owns the single
//! in-flight request.

mod block;
mod error;
mod host;
mod reconciler;
mod runtime;

pub use block::{
    block_body, compose_submission, rewrite_block_line, splice_block_body, verify_block,
    BlockContext, BlockSection,
};
pub use error::{
    DocumentError, LineActionError, SubmitError, ValidationError, BLOCK_CHANGED_NOTICE,
    EMPTY_REQUEST_NOTICE, IN_PROGRESS_NOTICE, MISSING_FILE_NOTICE,
};
pub use host::{CompletionHost, DocumentHost, StartRequest};
pub use reconciler::{
    error_text, usage_footer, ApplyOutcome, InFlightRequest, InFlightSlot, Outcome, Phase,
    Reconciler, RequestSettings, ERROR_TEXT_PREFIX,
};
pub use runtime::{ChatController, CompletionTransport};
