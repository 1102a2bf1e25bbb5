//! Sentinel markers that delimit an in-progress answer inside block text.
//!
//! The markers live in the document itself, so "is a request pending for this
//! block" is a substring search and every rewrite of the answer is a splice
//! between the two markers. All rewrites fail closed: when the markers cannot
//! be found the input comes back unchanged.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use uuid::Uuid;

use crate::role::Role;

pub const RESPONSE_START: &str = "<span class='ofx-response-start'></span>";
pub const RESPONSE_END: &str = "<span class='ofx-thinking'></span>";
pub const PLACEHOLDER_TEXT: &str = "Please, bear with me.";

const ANCHOR_OPEN: &str = "<span class='ofx-request' data-request='";
const ANCHOR_CLOSE: &str = "'></span>";

/// Inline anchor naming the request that owns a marked region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestAnchor {
    id: String,
}

impl RequestAnchor {
    /// Creates an anchor with a fresh random id.
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Wraps an existing id. Ids must be non-empty ASCII alphanumerics or `-`.
    pub fn from_id(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        valid.then_some(Self { id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Inline markup embedded in the document.
    pub fn markup(&self) -> String {
        format!("{ANCHOR_OPEN}{}{ANCHOR_CLOSE}", self.id)
    }
}

impl fmt::Display for RequestAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkedRegion {
    start: usize,
    inner_start: usize,
    inner_end: usize,
    end: usize,
}

/// Text of a fresh pending region: start marker, wording, anchor, end marker.
pub fn placeholder(anchor: Option<&RequestAnchor>) -> String {
    let anchor = anchor.map(RequestAnchor::markup).unwrap_or_default();
    format!("{RESPONSE_START}{PLACEHOLDER_TEXT}{anchor}{RESPONSE_END}")
}

/// Appends an assistant turn holding a pending region to `text`.
pub fn insert_placeholder(text: &str, anchor: Option<&RequestAnchor>) -> String {
    let mut out = String::with_capacity(text.len() + 128);
    out.push_str(text);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&Role::Assistant.turn_prefix());
    out.push_str(&placeholder(anchor));
    out
}

/// Returns true when `text` holds a start marker, i.e. an answer is pending.
pub fn has_pending_response(text: &str) -> bool {
    text.contains(RESPONSE_START)
}

/// Anchor embedded in the first pending region, if any.
pub fn pending_anchor(text: &str) -> Option<RequestAnchor> {
    let region = locate(text, None)?;
    let inner = &text[region.inner_start..region.inner_end];
    let open = inner.find(ANCHOR_OPEN)? + ANCHOR_OPEN.len();
    let close = open + inner[open..].find(ANCHOR_CLOSE)?;
    RequestAnchor::from_id(&inner[open..close])
}

/// Byte range of the marked region, markers included.
///
/// With an anchor the region is the one that contains it: the last start
/// marker before the anchor and the first end marker after it. Without one it
/// is the first start marker and the first end marker following it.
pub fn find_response_region(text: &str, anchor: Option<&RequestAnchor>) -> Option<Range<usize>> {
    locate(text, anchor).map(|region| region.start..region.end)
}

/// Replaces the text between the markers, keeping the markers.
///
/// When `anchor` is given the search is scoped to its region and the anchor
/// is written back after the new content so later updates can find it again.
pub fn replace_between_marks(
    text: &str,
    new_inner: &str,
    anchor: Option<&RequestAnchor>,
) -> String {
    let Some(region) = locate(text, anchor) else {
        return text.to_string();
    };

    let mut inner = sanitize(new_inner).into_owned();
    if let Some(anchor) = anchor {
        inner.push_str(&anchor.markup());
    }
    splice(text, region.inner_start..region.inner_end, &inner)
}

/// Replaces the whole region, markers included, with `content` and a newline.
///
/// Applying it a second time is a no-op since the markers are gone.
pub fn finalize_between_marks(
    text: &str,
    content: &str,
    anchor: Option<&RequestAnchor>,
) -> String {
    let Some(region) = locate(text, anchor) else {
        return text.to_string();
    };

    let mut finished = sanitize(content).into_owned();
    finished.push('\n');
    splice(text, region.start..region.end, &finished)
}

/// Removes the whole region, markers included.
pub fn clear_between_marks(text: &str, anchor: Option<&RequestAnchor>) -> String {
    let Some(region) = locate(text, anchor) else {
        return text.to_string();
    };

    splice(text, region.start..region.end, "")
}

/// Strips marker tokens so spliced content cannot forge or close a region.
pub fn sanitize(content: &str) -> Cow<'_, str> {
    if !content.contains(RESPONSE_START)
        && !content.contains(RESPONSE_END)
        && !content.contains(ANCHOR_OPEN)
    {
        return Cow::Borrowed(content);
    }

    Cow::Owned(
        content
            .replace(RESPONSE_START, "")
            .replace(RESPONSE_END, "")
            .replace(ANCHOR_OPEN, ""),
    )
}

fn locate(text: &str, anchor: Option<&RequestAnchor>) -> Option<MarkedRegion> {
    let (start, search_from) = match anchor {
        Some(anchor) => {
            let at = text.find(&anchor.markup())?;
            let start = text[..at].rfind(RESPONSE_START)?;
            if text[start..at].contains(RESPONSE_END) {
                return None;
            }
            (start, at)
        }
        None => {
            let start = text.find(RESPONSE_START)?;
            (start, start + RESPONSE_START.len())
        }
    };

    let inner_end = search_from + text[search_from..].find(RESPONSE_END)?;
    Some(MarkedRegion {
        start,
        inner_start: start + RESPONSE_START.len(),
        inner_end,
        end: inner_end + RESPONSE_END.len(),
    })
}

fn splice(text: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() - range.len() + replacement.len());
    out.push_str(&text[..range.start]);
    out.push_str(replacement);
    out.push_str(&text[range.end..]);
    out
}
