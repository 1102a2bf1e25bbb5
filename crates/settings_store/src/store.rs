use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SettingsStoreError;
use crate::schema::Settings;

/// Settings bound to their backing file.
///
/// Every mutation through [`SettingsStore::update`] is written back before it
/// returns.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Loads settings from `path`; a missing file yields defaults without
    /// creating it.
    pub fn open(path: &Path) -> Result<Self, SettingsStoreError> {
        let path = path.to_path_buf();
        let settings = match fs::read_to_string(&path) {
            Ok(raw) => parse_settings(&path, &raw)?,
            Err(source) if source.kind() == ErrorKind::NotFound => Settings::default(),
            Err(source) => {
                return Err(SettingsStoreError::io("reading settings file", &path, source))
            }
        };

        Ok(Self { path, settings })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies `change` and persists the result.
    ///
    /// The in-memory settings are only replaced once the write succeeded.
    pub fn update<F>(&mut self, change: F) -> Result<&Settings, SettingsStoreError>
    where
        F: FnOnce(&mut Settings),
    {
        let mut next = self.settings.clone();
        change(&mut next);
        write_settings(&self.path, &next)?;
        self.settings = next;
        Ok(&self.settings)
    }

    /// Writes the current settings to disk.
    pub fn save(&self) -> Result<(), SettingsStoreError> {
        write_settings(&self.path, &self.settings)
    }
}

fn parse_settings(path: &Path, raw: &str) -> Result<Settings, SettingsStoreError> {
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|source| SettingsStoreError::json_parse(path, source))?;
    if !value.is_object() {
        return Err(SettingsStoreError::NotAnObject {
            path: path.to_path_buf(),
        });
    }

    serde_json::from_value(value).map_err(|source| SettingsStoreError::json_parse(path, source))
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), SettingsStoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| SettingsStoreError::io("creating settings directory", parent, source))?;
    }

    let mut body = serde_json::to_string_pretty(settings)
        .map_err(|source| SettingsStoreError::json_serialize(path, source))?;
    body.push('\n');

    let staging = staging_path(path);
    fs::write(&staging, body)
        .map_err(|source| SettingsStoreError::io("writing settings staging file", &staging, source))?;
    fs::rename(&staging, path)
        .map_err(|source| SettingsStoreError::io("replacing settings file", path, source))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
