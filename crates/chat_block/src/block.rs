//! Locating and rewriting one fenced dialogue block inside a document.
//!
//! A block is addressed by the zero-based line numbers of its opening and
//! closing fences. Lines are split on `\n` only, so `\r` from CRLF documents
//! stays attached to its line and survives every rewrite.

use transcript::{insert_placeholder, LineAction, RequestAnchor, Role};

use crate::error::{DocumentError, LineActionError};

/// Fence lines of a block: `line_start` opens it, `line_end` closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSection {
    pub line_start: usize,
    pub line_end: usize,
}

impl BlockSection {
    #[must_use]
    pub fn new(line_start: usize, line_end: usize) -> Self {
        Self {
            line_start,
            line_end,
        }
    }

    /// Number of body lines between the fences.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.line_end.saturating_sub(self.line_start + 1)
    }
}

/// What the host hands over when it renders a block: where it lives and the
/// body text it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub source_path: String,
    pub section: BlockSection,
    pub source: String,
}

impl BlockContext {
    pub fn new(
        source_path: impl Into<String>,
        section: BlockSection,
        source: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            section,
            source: source.into(),
        }
    }
}

/// Body text between the fences of `section`.
pub fn block_body(document: &str, section: BlockSection) -> Result<String, DocumentError> {
    let lines: Vec<&str> = document.split('\n').collect();
    check_section(lines.len(), section)?;
    Ok(lines[section.line_start + 1..section.line_end].join("\n"))
}

/// Checks that `section` still holds the block the host rendered: both
/// fence lines are fences and the body equals `source`.
///
/// Lines added or removed elsewhere shift the fences, so a stale section
/// fails here instead of splicing over unrelated text.
pub fn verify_block(
    document: &str,
    section: BlockSection,
    source: &str,
) -> Result<(), DocumentError> {
    let lines: Vec<&str> = document.split('\n').collect();
    check_section(lines.len(), section)?;

    let fenced = is_fence(lines[section.line_start]) && is_fence(lines[section.line_end]);
    if fenced && lines[section.line_start + 1..section.line_end].join("\n") == source {
        return Ok(());
    }

    Err(DocumentError::BlockChanged {
        line_start: section.line_start,
        line_end: section.line_end,
    })
}

fn is_fence(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("```") || line.starts_with("~~~")
}

/// Replaces the body of `section` with `body`, keeping both fences.
///
/// Returns the new document and the section the block occupies afterwards.
pub fn splice_block_body(
    document: &str,
    section: BlockSection,
    body: &str,
) -> Result<(String, BlockSection), DocumentError> {
    let lines: Vec<&str> = document.split('\n').collect();
    check_section(lines.len(), section)?;

    let before = lines[..=section.line_start].join("\n");
    let after = lines[section.line_end..].join("\n");
    let spliced = format!("{before}\n{body}\n{after}");

    let body_lines = body.split('\n').count();
    let moved = BlockSection::new(section.line_start, section.line_start + 1 + body_lines);
    Ok((spliced, moved))
}

/// Block body after a submit: the old source, the new user turn and an
/// assistant turn holding a fresh pending region owned by `anchor`.
pub fn compose_submission(source: &str, text: &str, anchor: &RequestAnchor) -> String {
    let user_turn = format!("{source}\n{}{text}\n\n", Role::User.turn_prefix());
    insert_placeholder(&user_turn, Some(anchor))
}

/// Applies `action` to body line `line` of `section`.
pub fn rewrite_block_line(
    document: &str,
    section: BlockSection,
    line: usize,
    action: LineAction,
) -> Result<String, LineActionError> {
    let mut lines: Vec<String> = document.split('\n').map(str::to_string).collect();
    check_section(lines.len(), section)?;
    if line >= section.body_len() {
        return Err(DocumentError::LineOutOfRange { line }.into());
    }

    let index = section.line_start + 1 + line;
    let rewritten = action
        .apply(&lines[index])
        .ok_or(LineActionError::NotApplicable { line })?;
    lines[index] = rewritten;
    Ok(lines.join("\n"))
}

fn check_section(line_count: usize, section: BlockSection) -> Result<(), DocumentError> {
    if section.line_start < section.line_end && section.line_end < line_count {
        return Ok(());
    }

    Err(DocumentError::SectionOutOfRange {
        line_start: section.line_start,
        line_end: section.line_end,
        line_count,
    })
}
