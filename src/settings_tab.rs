//! Field model of the plugin settings panel.
//!
//! The host draws the panel; this module describes each field and applies
//! edits to [`Settings`].

use settings_store::{Settings, DEFAULT_MODEL};

use crate::error::PluginError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingId {
    Token,
    Model,
    InitialPrompt,
    Template,
    ShowConsumedTokens,
}

impl SettingId {
    pub const ALL: [SettingId; 5] = [
        SettingId::Token,
        SettingId::Model,
        SettingId::InitialPrompt,
        SettingId::Template,
        SettingId::ShowConsumedTokens,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingField {
    pub id: SettingId,
    pub name: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Toggle(bool),
}

impl SettingValue {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Toggle(_) => "toggle",
        }
    }
}

pub fn setting_field(id: SettingId) -> SettingField {
    let (name, description, placeholder, kind) = match id {
        SettingId::Token => (
            "Token",
            "The token of ChatGPT",
            "sk-TrbCVkcuvcshu7b....",
            FieldKind::Text,
        ),
        SettingId::Model => ("Model", "Model", DEFAULT_MODEL, FieldKind::Text),
        SettingId::InitialPrompt => (
            "Initial prompt",
            "Initial prompt; i.e., instructions and prerequisites presented to the AI.",
            "Behave as a British English speaker and answer my questions",
            FieldKind::TextArea,
        ),
        SettingId::Template => (
            "Conversation customising template",
            "",
            "",
            FieldKind::TextArea,
        ),
        SettingId::ShowConsumedTokens => (
            "Show consumed tokens",
            "Append the token count reported by the API below each answer.",
            "",
            FieldKind::Toggle,
        ),
    };

    SettingField {
        id,
        name,
        description,
        placeholder,
        kind,
    }
}

/// Fields in panel order.
pub fn settings_fields() -> Vec<SettingField> {
    SettingId::ALL.into_iter().map(setting_field).collect()
}

pub fn current_value(settings: &Settings, id: SettingId) -> SettingValue {
    match id {
        SettingId::Token => SettingValue::Text(settings.token.clone()),
        SettingId::Model => SettingValue::Text(settings.model.clone()),
        SettingId::InitialPrompt => SettingValue::Text(settings.default_system.clone()),
        SettingId::Template => SettingValue::Text(settings.template.clone()),
        SettingId::ShowConsumedTokens => SettingValue::Toggle(settings.show_consumed_tokens),
    }
}

/// Writes `value` into the field `id` refers to.
///
/// A value of the wrong kind leaves `settings` untouched.
pub fn apply_value(
    settings: &mut Settings,
    id: SettingId,
    value: SettingValue,
) -> Result<(), PluginError> {
    match (id, value) {
        (SettingId::Token, SettingValue::Text(text)) => settings.token = text,
        (SettingId::Model, SettingValue::Text(text)) => settings.model = text,
        (SettingId::InitialPrompt, SettingValue::Text(text)) => settings.default_system = text,
        (SettingId::Template, SettingValue::Text(text)) => settings.template = text,
        (SettingId::ShowConsumedTokens, SettingValue::Toggle(on)) => {
            settings.show_consumed_tokens = on
        }
        (id, value) => {
            return Err(PluginError::ValueKind {
                setting: setting_field(id).name,
                found: value.kind_name(),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use settings_store::Settings;

    use super::{apply_value, current_value, settings_fields, FieldKind, SettingId, SettingValue};
    use crate::error::PluginError;

    #[test]
    fn panel_lists_every_setting_once() {
        let fields = settings_fields();
        let names: Vec<&str> = fields.iter().map(|field| field.name).collect();

        assert_eq!(
            names,
            vec![
                "Token",
                "Model",
                "Initial prompt",
                "Conversation customising template",
                "Show consumed tokens",
            ]
        );
        assert_eq!(fields[4].kind, FieldKind::Toggle);
        assert_eq!(fields[2].kind, FieldKind::TextArea);
    }

    #[test]
    fn applied_values_read_back() {
        let mut settings = Settings::default();
        apply_value(
            &mut settings,
            SettingId::InitialPrompt,
            SettingValue::Text("Be terse".to_string()),
        )
        .expect("apply prompt");
        apply_value(
            &mut settings,
            SettingId::ShowConsumedTokens,
            SettingValue::Toggle(true),
        )
        .expect("apply toggle");

        assert_eq!(settings.default_system, "Be terse");
        assert_eq!(
            current_value(&settings, SettingId::ShowConsumedTokens),
            SettingValue::Toggle(true)
        );
    }

    #[test]
    fn wrong_kind_is_rejected_without_change() {
        let mut settings = Settings::default();
        let error = apply_value(&mut settings, SettingId::Model, SettingValue::Toggle(true))
            .expect_err("kind mismatch");

        assert!(matches!(
            error,
            PluginError::ValueKind {
                setting: "Model",
                found: "toggle"
            }
        ));
        assert_eq!(settings, Settings::default());
    }
}
