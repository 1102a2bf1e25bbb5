use std::time::Duration;

use completion_provider::{Credentials, RequestId};
use transcript::{Message, RequestAnchor, SamplingOptions};

use crate::error::DocumentError;

/// Document store, renderer and notice surface provided by the embedding
/// application.
///
/// All document writes go through [`DocumentHost::mutate_document`], which
/// must apply `change` as one atomic read-modify-write.
pub trait DocumentHost {
    fn read_document(&mut self, path: &str) -> Result<String, DocumentError>;

    fn mutate_document(
        &mut self,
        path: &str,
        change: &mut dyn FnMut(&str) -> String,
    ) -> Result<(), DocumentError>;

    /// Tells views of `path` that its content changed.
    fn notify_changed(&mut self, path: &str);

    /// Re-renders the view region owned by `anchor`.
    fn render(&mut self, markdown: &str, anchor: &RequestAnchor, source_path: &str);

    /// Shows a transient message; `None` leaves the duration to the host.
    fn notice(&mut self, message: &str, timeout: Option<Duration>);
}

/// Everything a transport needs to start one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub model: String,
    pub credentials: Credentials,
    pub messages: Vec<Message>,
    pub options: SamplingOptions,
}

pub trait CompletionHost {
    fn start_completion(&mut self, request: StartRequest) -> Result<RequestId, String>;
    fn cancel_completion(&mut self, request_id: RequestId);
}
