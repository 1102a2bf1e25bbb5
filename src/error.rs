use completion_provider::ProviderInitError;
use settings_store::SettingsStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("settings: {0}")]
    Settings(#[from] SettingsStoreError),

    #[error("failed to initialise completion provider: {0}")]
    Provider(#[from] ProviderInitError),

    #[error("setting {setting:?} does not accept a {found} value")]
    ValueKind {
        setting: &'static str,
        found: &'static str,
    },
}
