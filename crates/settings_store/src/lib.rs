mod error;
mod paths;
mod schema;
mod store;

pub use error::SettingsStoreError;
pub use paths::{plugin_data_path, PLUGIN_DATA_FILE, PLUGIN_DIR};
pub use schema::{Settings, DEFAULT_MODEL, DEFAULT_TEMPLATE};
pub use store::SettingsStore;
