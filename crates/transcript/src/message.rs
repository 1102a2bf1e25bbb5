use serde::{Deserialize, Serialize};

use crate::role::Role;

/// One completed transcript turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Sampling parameter that can be set by a `##<name> <value>` directive line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingParam {
    Temperature,
    TopP,
    MaxTokens,
    PresencePenalty,
}

/// Prefix shared by every directive line.
pub const DIRECTIVE_PREFIX: &str = "##";

impl SamplingParam {
    pub const ALL: [SamplingParam; 4] = [
        SamplingParam::Temperature,
        SamplingParam::TopP,
        SamplingParam::MaxTokens,
        SamplingParam::PresencePenalty,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::MaxTokens => "max_tokens",
            Self::PresencePenalty => "presence_penalty",
        }
    }

    /// Splits a directive for this parameter off `line`, returning the raw
    /// remainder after the parameter name.
    pub fn strip_directive(self, line: &str) -> Option<&str> {
        line.strip_prefix(DIRECTIVE_PREFIX)?
            .strip_prefix(self.name())
    }
}

/// Optional sampling overrides for one request.
///
/// Every field is `None` unless a directive line set it; `None` means the
/// server default applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

impl SamplingOptions {
    /// Applies a directive value. Non-finite values are ignored and
    /// `max_tokens` is truncated to a non-negative integer.
    pub fn set(&mut self, param: SamplingParam, value: f64) {
        if !value.is_finite() {
            return;
        }

        match param {
            SamplingParam::Temperature => self.temperature = Some(value),
            SamplingParam::TopP => self.top_p = Some(value),
            SamplingParam::PresencePenalty => self.presence_penalty = Some(value),
            SamplingParam::MaxTokens => {
                if value >= 0.0 {
                    self.max_tokens = Some(value.trunc().min(f64::from(u32::MAX)) as u32);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{SamplingOptions, SamplingParam};

    #[test]
    fn strip_directive_requires_double_hash_and_exact_name() {
        assert_eq!(
            SamplingParam::Temperature.strip_directive("##temperature 0.7"),
            Some(" 0.7")
        );
        assert_eq!(SamplingParam::TopP.strip_directive("#top_p 1"), None);
        assert_eq!(SamplingParam::TopP.strip_directive("##temperature 1"), None);
    }

    #[test]
    fn max_tokens_is_truncated_and_negative_values_are_ignored() {
        let mut options = SamplingOptions::default();
        options.set(SamplingParam::MaxTokens, 256.9);
        assert_eq!(options.max_tokens, Some(256));

        options.set(SamplingParam::MaxTokens, -1.0);
        assert_eq!(options.max_tokens, Some(256));
    }

    #[test]
    fn non_finite_values_leave_options_untouched() {
        let mut options = SamplingOptions::default();
        options.set(SamplingParam::Temperature, f64::NAN);
        options.set(SamplingParam::PresencePenalty, f64::INFINITY);
        assert!(options.is_empty());
    }
}
