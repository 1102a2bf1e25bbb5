//! Text protocol of an `aichat` dialogue block.
//!
//! This crate owns everything that reads or rewrites the plain-text syntax of
//! a dialogue block: role tags, sampling directives, commented lines and the
//! sentinel markers that bracket an answer while it is still streaming. It has
//! no knowledge of documents, transports or rendering.
//!
//! Parsing never fails. Any text is a valid transcript; in the worst case the
//! whole block becomes a single `user` message.

pub mod lines;
pub mod marks;
pub mod message;
pub mod parser;
pub mod role;

pub use lines::{is_commented, toggle_comment, LineAction};
pub use marks::{
    clear_between_marks, finalize_between_marks, find_response_region, has_pending_response,
    insert_placeholder, pending_anchor, placeholder, replace_between_marks, RequestAnchor,
    PLACEHOLDER_TEXT, RESPONSE_END, RESPONSE_START,
};
pub use message::{Message, SamplingOptions, SamplingParam};
pub use parser::{parse, Transcript};
pub use role::Role;
