//! Markdown handed to the host renderer for a dialogue block.

use std::sync::OnceLock;
use std::time::Duration;

use chat_block::{BlockContext, DocumentError, DocumentHost};
use regex::Regex;
use transcript::RequestAnchor;

/// First line of the collapsible callout wrapping every rendered block.
pub const CALLOUT_HEADER: &str = "> [!consult]+";
pub const USER_LABEL: &str = "USER:";
pub const SUBMIT_LABEL: &str = "🤵";
pub const CANCEL_LABEL: &str = "Cancel";

fn hash_line_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"(?m)^([ \t]*#.*)$").expect("hash line regex must compile"))
}

/// Wraps block source in a callout, hiding `#` lines (indented or not) as
/// HTML comments, the same lines the parser leaves out of the transcript.
///
/// Hidden lines stay in the rendered source so they can be toggled back.
pub fn render_source(source: &str) -> String {
    let hidden = hash_line_regex().replace_all(source, "<!-- $1 -->");

    let mut out = String::with_capacity(hidden.len() + CALLOUT_HEADER.len() + 16);
    out.push_str(CALLOUT_HEADER);
    for line in hidden.split('\n') {
        out.push_str("\n> ");
        out.push_str(line);
    }
    out
}

/// Everything the host needs to draw one block and its prompt row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub markdown: String,
    pub input_label: &'static str,
    pub submit_label: &'static str,
    /// Present while an answer is pending in this block.
    pub cancel_label: Option<&'static str>,
}

impl BlockView {
    pub fn new(context: &BlockContext, busy: bool) -> Self {
        Self {
            markdown: render_source(&context.source),
            input_label: USER_LABEL,
            submit_label: SUBMIT_LABEL,
            cancel_label: busy.then_some(CANCEL_LABEL),
        }
    }
}

/// Document host wrapper that renders streamed block text as a callout.
pub struct CalloutHost<'a> {
    inner: &'a mut dyn DocumentHost,
}

impl<'a> CalloutHost<'a> {
    pub fn new(inner: &'a mut dyn DocumentHost) -> Self {
        Self { inner }
    }
}

impl DocumentHost for CalloutHost<'_> {
    fn read_document(&mut self, path: &str) -> Result<String, DocumentError> {
        self.inner.read_document(path)
    }

    fn mutate_document(
        &mut self,
        path: &str,
        change: &mut dyn FnMut(&str) -> String,
    ) -> Result<(), DocumentError> {
        self.inner.mutate_document(path, change)
    }

    fn notify_changed(&mut self, path: &str) {
        self.inner.notify_changed(path);
    }

    fn render(&mut self, markdown: &str, anchor: &RequestAnchor, source_path: &str) {
        self.inner
            .render(&render_source(markdown), anchor, source_path);
    }

    fn notice(&mut self, message: &str, timeout: Option<Duration>) {
        self.inner.notice(message, timeout);
    }
}
