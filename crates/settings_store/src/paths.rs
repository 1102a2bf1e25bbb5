use std::path::{Path, PathBuf};

pub const PLUGIN_DIR: [&str; 2] = [".obsidian", "plugins"];
pub const PLUGIN_DATA_FILE: &str = "data.json";

/// Location of a plugin's persisted data inside a vault.
#[must_use]
pub fn plugin_data_path(vault_root: &Path, plugin_id: &str) -> PathBuf {
    vault_root
        .join(PLUGIN_DIR[0])
        .join(PLUGIN_DIR[1])
        .join(plugin_id)
        .join(PLUGIN_DATA_FILE)
}
