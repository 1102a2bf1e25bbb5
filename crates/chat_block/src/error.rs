use completion_provider::RequestId;
use thiserror::Error;

/// Notice shown when a submit collides with a pending answer.
pub const IN_PROGRESS_NOTICE: &str =
    "Some question is already in progress... If not, please modify the code block directly.";
pub const EMPTY_REQUEST_NOTICE: &str = "Request is empty";
pub const MISSING_FILE_NOTICE: &str = "Could not find the file";
/// Notice shown when the block moved or changed after it was rendered.
pub const BLOCK_CHANGED_NOTICE: &str =
    "The code block changed since it was displayed; please try again.";

/// Submit rejected before anything was written or sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{}", EMPTY_REQUEST_NOTICE)]
    EmptyInput,
    #[error("{}", IN_PROGRESS_NOTICE)]
    RequestInProgress { request_id: RequestId },
    #[error("{}", IN_PROGRESS_NOTICE)]
    BlockBusy,
}

/// Failure reported by, or while rewriting, a host document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("{notice}: {path}", notice = MISSING_FILE_NOTICE)]
    NotFound { path: String },
    #[error("block fences {line_start}..{line_end} do not fit a document of {line_count} lines")]
    SectionOutOfRange {
        line_start: usize,
        line_end: usize,
        line_count: usize,
    },
    #[error("{notice} (fences {line_start}..{line_end})", notice = BLOCK_CHANGED_NOTICE)]
    BlockChanged { line_start: usize, line_end: usize },
    #[error("line {line} is outside the dialogue block")]
    LineOutOfRange { line: usize },
    #[error("document host failed: {0}")]
    Host(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("failed to start completion: {0}")]
    Start(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("line {line} cannot be toggled")]
    NotApplicable { line: usize },
}
