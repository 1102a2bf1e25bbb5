use std::fmt;

use serde::{Deserialize, Serialize};

/// Author of one transcript turn.
///
/// Each role has a fixed tag in block text (`**USER**`) and a fixed name on
/// the wire (`user`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Separator expected right after a role tag (`**USER**: hello`).
pub const TAG_SEPARATOR: char = ':';

impl Role {
    pub const ALL: [Role; 3] = [Role::System, Role::User, Role::Assistant];

    /// Tag that opens a turn of this role in block text.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::System => "**SYSTEM**",
            Self::User => "**USER**",
            Self::Assistant => "**ASSISTANT**",
        }
    }

    /// Role name used by the completion API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Splits a leading role tag off `line`.
    ///
    /// Returns the role and the text following the tag with exactly one
    /// separator removed. `line` is expected to be trimmed at the start.
    pub fn strip_tag(line: &str) -> Option<(Self, &str)> {
        Self::ALL.into_iter().find_map(|role| {
            let rest = line.strip_prefix(role.tag())?;
            Some((role, rest.strip_prefix(TAG_SEPARATOR).unwrap_or(rest)))
        })
    }

    /// Formats the opening of a turn, e.g. `**USER**: `.
    pub fn turn_prefix(self) -> String {
        format!("{}{TAG_SEPARATOR} ", self.tag())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
