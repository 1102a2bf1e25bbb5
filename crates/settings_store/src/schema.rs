use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0301";
pub const DEFAULT_TEMPLATE: &str = "##temperature\n##top_p\n##max_tokens\n##presence_penalty";

/// Plugin settings as stored in `data.json`.
///
/// Missing fields take their defaults, unknown fields are ignored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Bearer token for the completion API.
    pub token: String,
    pub model: String,
    /// System prompt inserted by the new-dialogue command.
    pub default_system: String,
    /// Directive lines inserted at the top of a new dialogue.
    pub template: String,
    pub show_consumed_tokens: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: String::new(),
            model: DEFAULT_MODEL.to_string(),
            default_system: String::new(),
            template: DEFAULT_TEMPLATE.to_string(),
            show_consumed_tokens: false,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Settings")
            .field("token", &token)
            .field("model", &self.model)
            .field("default_system", &self.default_system)
            .field("template", &self.template)
            .field("show_consumed_tokens", &self.show_consumed_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Settings, DEFAULT_MODEL};

    #[test]
    fn stored_fields_override_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"token":"sk-1","showConsumedTokens":true,"legacy":1}"#)
                .expect("parse settings");

        assert_eq!(settings.token, "sk-1");
        assert!(settings.show_consumed_tokens);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.template, Settings::default().template);
    }

    #[test]
    fn serialized_field_names_are_camel_case() {
        let value = serde_json::to_value(Settings::default()).expect("serialize");
        assert!(value.get("defaultSystem").is_some());
        assert!(value.get("showConsumedTokens").is_some());
    }

    #[test]
    fn debug_output_redacts_token() {
        let settings = Settings {
            token: "sk-secret".to_string(),
            ..Settings::default()
        };
        assert!(!format!("{settings:?}").contains("sk-secret"));
    }
}
