use std::fs;

use settings_store::{plugin_data_path, Settings, SettingsStore, SettingsStoreError};
use tempfile::TempDir;

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

#[test]
fn missing_file_yields_defaults_without_creating_it() {
    let dir = temp_dir();
    let path = plugin_data_path(dir.path(), "aichat");

    let store = SettingsStore::open(&path).expect("open missing settings");

    assert_eq!(store.settings(), &Settings::default());
    assert!(!path.exists());
}

#[test]
fn update_persists_and_reloads() {
    let dir = temp_dir();
    let path = plugin_data_path(dir.path(), "aichat");

    let mut store = SettingsStore::open(&path).expect("open");
    store
        .update(|settings| {
            settings.token = "sk-test".to_string();
            settings.show_consumed_tokens = true;
        })
        .expect("update settings");

    let reloaded = SettingsStore::open(&path).expect("reopen");
    assert_eq!(reloaded.settings().token, "sk-test");
    assert!(reloaded.settings().show_consumed_tokens);
    assert_eq!(reloaded.settings().model, Settings::default().model);

    let staging = path.with_file_name("data.json.tmp");
    assert!(!staging.exists(), "staging file should be renamed away");
}

#[test]
fn partial_file_keeps_defaults_for_missing_fields() {
    let dir = temp_dir();
    let path = dir.path().join("data.json");
    fs::write(&path, r#"{"model":"gpt-4","defaultSystem":"Be terse"}"#).expect("seed");

    let store = SettingsStore::open(&path).expect("open");

    assert_eq!(store.settings().model, "gpt-4");
    assert_eq!(store.settings().default_system, "Be terse");
    assert_eq!(store.settings().template, Settings::default().template);
    assert!(store.settings().token.is_empty());
}

#[test]
fn malformed_json_reports_path() {
    let dir = temp_dir();
    let path = dir.path().join("data.json");
    fs::write(&path, "{not json").expect("seed");

    let error = SettingsStore::open(&path).expect_err("malformed settings");

    assert!(matches!(error, SettingsStoreError::JsonParse { .. }));
    assert!(error.to_string().contains("data.json"));
}

#[test]
fn non_object_json_is_rejected() {
    let dir = temp_dir();
    let path = dir.path().join("data.json");
    fs::write(&path, "[1, 2]").expect("seed");

    let error = SettingsStore::open(&path).expect_err("array settings");
    assert!(matches!(error, SettingsStoreError::NotAnObject { .. }));
}

#[test]
fn plugin_data_path_follows_vault_layout() {
    let dir = temp_dir();
    let path = plugin_data_path(dir.path(), "aichat");
    assert!(path.ends_with(".obsidian/plugins/aichat/data.json"));
}
