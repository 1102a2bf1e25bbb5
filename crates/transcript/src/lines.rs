use crate::parser::{classify, LineKind, COMMENT_PREFIX};

/// Line-level edit requested from the rendered transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    /// Enable or disable the line by removing or adding the comment prefix.
    Toggle,
    /// Blank the line.
    Remove,
}

impl LineAction {
    /// Applies the action to one line.
    ///
    /// Returns `None` when the action does not apply: directive lines cannot be
    /// toggled, and neither can comments whose remainder is a directive.
    pub fn apply(self, line: &str) -> Option<String> {
        match self {
            Self::Toggle => toggle_comment(line),
            Self::Remove => Some(String::new()),
        }
    }
}

/// True when the line is disabled by a single-hash comment prefix.
pub fn is_commented(line: &str) -> bool {
    matches!(classify(line), LineKind::Comment)
}

/// Adds or removes the single-hash comment prefix, keeping indentation.
pub fn toggle_comment(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];

    match classify(line) {
        LineKind::Directive { .. } => None,
        LineKind::Comment => {
            let uncommented = trimmed.strip_prefix(COMMENT_PREFIX).unwrap_or(trimmed);
            // `###temperature 1` must not turn into a live directive.
            if matches!(classify(uncommented), LineKind::Directive { .. }) {
                return None;
            }
            Some(format!("{indent}{uncommented}"))
        }
        LineKind::RoleSwitch { .. } | LineKind::Content => {
            Some(format!("{indent}{COMMENT_PREFIX}{trimmed}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{is_commented, toggle_comment, LineAction};

    #[test]
    fn toggle_round_trips_content_and_role_lines() {
        let disabled = toggle_comment("**USER**: hi").expect("toggle applies");
        assert_eq!(disabled, "#**USER**: hi");
        assert!(is_commented(&disabled));
        assert_eq!(toggle_comment(&disabled).as_deref(), Some("**USER**: hi"));
    }

    #[test]
    fn toggle_keeps_indentation() {
        assert_eq!(toggle_comment("  text").as_deref(), Some("  #text"));
        assert_eq!(toggle_comment("  #text").as_deref(), Some("  text"));
    }

    #[test]
    fn directives_cannot_be_toggled() {
        assert_eq!(toggle_comment("##temperature 0.5"), None);
        assert!(!is_commented("##temperature 0.5"));
    }

    #[test]
    fn commented_directive_stays_disabled() {
        assert!(is_commented("###temperature 1"));
        assert_eq!(toggle_comment("###temperature 1"), None);
        assert_eq!(toggle_comment("  ###top_p 0.3"), None);
        assert_eq!(toggle_comment("###note").as_deref(), Some("##note"));
    }

    #[test]
    fn remove_blanks_any_line() {
        assert_eq!(LineAction::Remove.apply("##top_p 1").as_deref(), Some(""));
    }
}
