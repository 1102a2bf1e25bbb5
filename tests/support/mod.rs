#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use aichat::{BlockContext, BlockSection, DocumentError, DocumentHost, EditorHost, BLOCK_FENCE};
use transcript::RequestAnchor;

pub const NOTE: &str = "daily/2024-05-01.md";

/// In-memory vault recording render calls and notices.
#[derive(Debug, Default)]
pub struct SpyVault {
    pub documents: HashMap<String, String>,
    pub renders: Vec<String>,
    pub notices: Vec<String>,
}

impl SpyVault {
    pub fn with_document(path: &str, text: &str) -> Self {
        let mut vault = Self::default();
        vault.documents.insert(path.to_string(), text.to_string());
        vault
    }

    pub fn text(&self, path: &str) -> &str {
        self.documents
            .get(path)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("document {path} is missing"))
    }
}

impl DocumentHost for SpyVault {
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
        Ok(())
    }

    fn notify_changed(&mut self, _path: &str) {}

    fn render(&mut self, markdown: &str, _anchor: &RequestAnchor, _source_path: &str) {
        self.renders.push(markdown.to_string());
    }

    fn notice(&mut self, message: &str, _timeout: Option<Duration>) {
        self.notices.push(message.to_string());
    }
}

/// Editor that records inserted text.
#[derive(Debug, Default)]
pub struct SpyEditor {
    pub inserted: Vec<String>,
}

impl EditorHost for SpyEditor {
    fn replace_selection(&mut self, text: &str) {
        self.inserted.push(text.to_string());
    }
}

/// First `aichat` block of `path`, located by its fence lines.
pub fn first_block(vault: &SpyVault, path: &str) -> BlockContext {
    let text = vault.text(path);
    let lines: Vec<&str> = text.split('\n').collect();
    let opening = format!("{BLOCK_FENCE}aichat");

    let start = lines
        .iter()
        .position(|line| *line == opening)
        .unwrap_or_else(|| panic!("document {path} has no aichat block"));
    let end = (start + 1..lines.len())
        .find(|line| lines[*line] == BLOCK_FENCE)
        .unwrap_or_else(|| panic!("unterminated block at line {start}"));

    let source = lines[start + 1..end].join("\n");
    BlockContext::new(path, BlockSection::new(start, end), source)
}
