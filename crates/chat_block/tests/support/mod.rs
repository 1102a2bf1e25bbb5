#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use chat_block::{
    BlockContext, BlockSection, CompletionHost, DocumentError, DocumentHost, StartRequest,
};
use completion_provider::RequestId;
use transcript::RequestAnchor;

pub const NOTE: &str = "notes/chat.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    pub markdown: String,
    pub anchor: String,
    pub source_path: String,
}

/// In-memory document store that records every call it receives.
#[derive(Debug, Default)]
pub struct SpyDocuments {
    pub documents: HashMap<String, String>,
    pub mutations: Vec<String>,
    pub changed: Vec<String>,
    pub renders: Vec<RenderCall>,
    pub notices: Vec<(String, Option<Duration>)>,
}

impl SpyDocuments {
    pub fn with_document(path: &str, text: &str) -> Self {
        let mut docs = Self::default();
        docs.documents.insert(path.to_string(), text.to_string());
        docs
    }

    pub fn text(&self, path: &str) -> &str {
        self.documents
            .get(path)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("document {path} is missing"))
    }

    pub fn set_text(&mut self, path: &str, text: impl Into<String>) {
        self.documents.insert(path.to_string(), text.into());
    }

    pub fn notice_texts(&self) -> Vec<&str> {
        self.notices
            .iter()
            .map(|(message, _)| message.as_str())
            .collect()
    }
}

impl DocumentHost for SpyDocuments {
    fn read_document(&mut self, path: &str) -> Result<String, DocumentError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound {
                path: path.to_string(),
            })
    }

    fn mutate_document(
        &mut self,
        path: &str,
        change: &mut dyn FnMut(&str) -> String,
    ) -> Result<(), DocumentError> {
        let Some(current) = self.documents.get(path) else {
            return Err(DocumentError::NotFound {
                path: path.to_string(),
            });
        };
        let next = change(current);
        self.documents.insert(path.to_string(), next);
        self.mutations.push(path.to_string());
        Ok(())
    }

    fn notify_changed(&mut self, path: &str) {
        self.changed.push(path.to_string());
    }

    fn render(&mut self, markdown: &str, anchor: &RequestAnchor, source_path: &str) {
        self.renders.push(RenderCall {
            markdown: markdown.to_string(),
            anchor: anchor.id().to_string(),
            source_path: source_path.to_string(),
        });
    }

    fn notice(&mut self, message: &str, timeout: Option<Duration>) {
        self.notices.push((message.to_string(), timeout));
    }
}

/// Completion host that records requests and hands out fixed ids.
#[derive(Debug)]
pub struct StubCompletions {
    pub next_request_id: RequestId,
    pub started: Vec<StartRequest>,
    pub cancelled: Vec<RequestId>,
    pub start_error: Option<String>,
}

impl StubCompletions {
    pub fn new(next_request_id: RequestId) -> Self {
        Self {
            next_request_id,
            started: Vec::new(),
            cancelled: Vec::new(),
            start_error: None,
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            start_error: Some(error.to_string()),
            ..Self::new(1)
        }
    }
}

impl CompletionHost for StubCompletions {
    fn start_completion(&mut self, request: StartRequest) -> Result<RequestId, String> {
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }
        self.started.push(request);
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        Ok(request_id)
    }

    fn cancel_completion(&mut self, request_id: RequestId) {
        self.cancelled.push(request_id);
    }
}

/// `intro` line, the fenced block, `outro` line.
pub fn note_with_block(body: &str) -> String {
    format!("intro\n```aichat\n{body}\n```\noutro")
}

/// Locates the `index`-th aichat block the way a host would before
/// rendering it.
pub fn nth_block(docs: &SpyDocuments, path: &str, index: usize) -> BlockContext {
    let text = docs.text(path);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut found = 0;
    let mut line = 0;

    while line < lines.len() {
        if lines[line] == "```aichat" {
            let end = (line + 1..lines.len())
                .find(|candidate| lines[*candidate] == "```")
                .unwrap_or_else(|| panic!("unterminated block at line {line}"));
            if found == index {
                let source = lines[line + 1..end].join("\n");
                return BlockContext::new(path, BlockSection::new(line, end), source);
            }
            found += 1;
            line = end;
        }
        line += 1;
    }

    panic!("document {path} has no block #{index}");
}

pub fn block(docs: &SpyDocuments, path: &str) -> BlockContext {
    nth_block(docs, path, 0)
}
