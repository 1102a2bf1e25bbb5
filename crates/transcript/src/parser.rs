use crate::marks::has_pending_response;
use crate::message::{Message, SamplingOptions, SamplingParam};
use crate::role::Role;

/// Prefix of a disabled line. Directive lines share it.
pub const COMMENT_PREFIX: char = '#';

/// Result of parsing one dialogue block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub messages: Vec<Message>,
    pub options: SamplingOptions,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// How a single block line is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind<'a> {
    /// `##<param> <value>`; `value` is `None` when empty or malformed.
    Directive {
        param: SamplingParam,
        value: Option<f64>,
    },
    /// Any other line starting with `#`.
    Comment,
    /// A role tag followed by the first content of the new turn.
    RoleSwitch { role: Role, rest: &'a str },
    Content,
}

/// Classifies one line. Leading whitespace is ignored for classification.
pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim_start();

    if trimmed.starts_with(COMMENT_PREFIX) {
        return SamplingParam::ALL
            .into_iter()
            .find_map(|param| {
                param.strip_directive(trimmed).map(|rest| LineKind::Directive {
                    param,
                    value: parse_directive_value(rest),
                })
            })
            .unwrap_or(LineKind::Comment);
    }

    match Role::strip_tag(trimmed) {
        Some((role, rest)) => LineKind::RoleSwitch { role, rest },
        None => LineKind::Content,
    }
}

fn parse_directive_value(rest: &str) -> Option<f64> {
    let value = rest.trim();
    if value.is_empty() {
        return None;
    }

    value.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses block text into role-tagged messages and sampling options.
///
/// Single pass over the lines; never fails. A trailing turn that still holds
/// a pending response region is left out, since it is the answer being
/// produced rather than history.
pub fn parse(block: &str) -> Transcript {
    let mut messages = Vec::new();
    let mut options = SamplingOptions::default();
    let mut role = Role::User;
    let mut buffer = String::new();

    for line in block.lines() {
        match classify(line) {
            LineKind::Directive { param, value } => {
                if let Some(value) = value {
                    options.set(param, value);
                }
            }
            LineKind::Comment => {}
            LineKind::RoleSwitch { role: next, rest } => {
                flush(&mut messages, role, &mut buffer);
                role = next;
                buffer.push_str(rest);
                buffer.push('\n');
            }
            LineKind::Content => {
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
    }

    if !has_pending_response(&buffer) {
        flush(&mut messages, role, &mut buffer);
    }

    Transcript { messages, options }
}

fn flush(messages: &mut Vec<Message>, role: Role, buffer: &mut String) {
    let content = buffer.trim();
    if !content.is_empty() {
        messages.push(Message::new(role, content));
    }
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{classify, parse, LineKind};
    use crate::message::{Message, SamplingParam};
    use crate::role::Role;

    #[test]
    fn classify_distinguishes_directives_comments_and_roles() {
        assert_eq!(
            classify("  ##top_p 0.5"),
            LineKind::Directive {
                param: SamplingParam::TopP,
                value: Some(0.5),
            }
        );
        assert_eq!(
            classify("##max_tokens"),
            LineKind::Directive {
                param: SamplingParam::MaxTokens,
                value: None,
            }
        );
        assert_eq!(classify("##seed 3"), LineKind::Comment);
        assert_eq!(classify("# heading"), LineKind::Comment);
        assert_eq!(
            classify("**ASSISTANT**: hi"),
            LineKind::RoleSwitch {
                role: Role::Assistant,
                rest: " hi",
            }
        );
        assert_eq!(classify("hello"), LineKind::Content);
    }

    #[test]
    fn leading_untagged_content_defaults_to_user() {
        let transcript = parse("hello there\n**ASSISTANT**: hi");

        assert_eq!(
            transcript.messages,
            vec![Message::user("hello there"), Message::assistant("hi")]
        );
    }

    #[test]
    fn empty_turns_are_skipped_but_still_switch_role() {
        let transcript = parse("**SYSTEM**:\n**ASSISTANT**:   \n**USER**: question");

        assert_eq!(transcript.messages, vec![Message::user("question")]);
    }

    #[test]
    fn multi_line_turns_keep_inner_lines_verbatim() {
        let transcript = parse("**USER**: first\n  indented\n\nlast\n**ASSISTANT**: ok");

        assert_eq!(
            transcript.messages,
            vec![
                Message::user("first\n  indented\n\nlast"),
                Message::assistant("ok"),
            ]
        );
    }

    #[test]
    fn later_directive_overrides_earlier_but_empty_one_does_not_clear() {
        let transcript = parse("##temperature 0.2\n##temperature 0.9\n##temperature\n**USER**: x");

        assert_eq!(transcript.options.temperature, Some(0.9));
    }

    #[test]
    fn malformed_directive_values_leave_option_unset() {
        let transcript = parse("##top_p abc\n##presence_penalty NaN\n**USER**: x");

        assert_eq!(transcript.options.top_p, None);
        assert_eq!(transcript.options.presence_penalty, None);
    }

    #[test]
    fn empty_block_yields_no_messages() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n# only a comment\n").is_empty());
    }
}
