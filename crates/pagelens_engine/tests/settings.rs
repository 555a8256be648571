use std::fs;

use pagelens_core::{default_prompts, PromptTemplate, Settings, SettingsError, DEFAULT_MODEL};
use pagelens_engine::{SettingsStore, StoreError, SETTINGS_FILENAME};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn missing_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::in_dir(temp.path());
    assert_eq!(store.get_settings(), Settings::default());
    assert_eq!(store.custom_prompts(), default_prompts());
}

#[test]
fn saved_settings_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::in_dir(&temp.path().join("nested"));
    let settings = Settings {
        api_key: " sk-abc ".into(),
        model: "gpt-4o-mini".into(),
        max_length: 2_000,
        custom_prompts: vec![PromptTemplate::new(
            "Reply",
            "Draft a reply",
            "https://mail.google.com/*",
        )],
    };

    let stored = store.save_settings(settings).unwrap();
    assert_eq!(stored.api_key, "sk-abc");
    assert!(store.path().ends_with(SETTINGS_FILENAME));
    assert_eq!(store.get_settings(), stored);
    assert_eq!(store.custom_prompts(), stored.custom_prompts);
}

#[test]
fn invalid_settings_are_not_written() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::in_dir(temp.path());
    let err = store
        .save_settings(Settings {
            max_length: 0,
            ..Settings::default()
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Invalid(SettingsError::ZeroMaxLength)));
    assert!(!store.path().exists());
}

#[test]
fn corrupt_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::in_dir(temp.path());
    fs::write(store.path(), "this is not ron (").unwrap();
    assert_eq!(store.get_settings().model, DEFAULT_MODEL);
}

#[test]
fn reset_prompts_keeps_other_fields() {
    let temp = TempDir::new().unwrap();
    let store = SettingsStore::in_dir(temp.path());
    store
        .save_settings(Settings {
            api_key: "sk-keep".into(),
            custom_prompts: vec![PromptTemplate::new("Mine", "Do it", "")],
            ..Settings::default()
        })
        .unwrap();

    let reset = store.reset_prompts().unwrap();
    assert_eq!(reset.api_key, "sk-keep");
    assert!(reset.custom_prompts.is_empty());
    assert_eq!(store.custom_prompts(), default_prompts());
}
