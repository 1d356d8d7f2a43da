//! Configuration loading tests

mod common;

use std::fs;

use tempfile::TempDir;

use backrooms::config::{AppConfig, ProviderKind};
use backrooms::error::Error;

use common::fixture_path;

#[test]
fn test_load_valid_fixture() {
    let path = fixture_path("valid_config.toml");
    let config = AppConfig::load(Some(path.to_str().unwrap())).unwrap();

    assert_eq!(config.provider.kind, ProviderKind::Mock);
    assert_eq!(config.personas.len(), 2);

    let rotation = config.rotation().unwrap();
    assert_eq!(rotation.persona_for_turn(0).display_name, "A");
    assert_eq!(rotation.persona_for_turn(1).display_name, "B");
    assert_eq!(rotation.persona_for_turn(2).display_name, "A");
}

#[test]
fn test_invalid_fixture_is_rejected() {
    let path = fixture_path("invalid_config.toml");
    let err = AppConfig::load(Some(path.to_str().unwrap())).unwrap_err();

    match err {
        Error::ConfigValidation { field, .. } => {
            assert_eq!(field.as_deref(), Some("limits.daily_limit"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[limits\ndaily_limit = ").unwrap();

    let err = AppConfig::load(Some(path.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_unknown_provider_kind_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[provider]\nkind = \"carrier-pigeon\"\n").unwrap();

    let err = AppConfig::load(Some(path.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
}

#[test]
fn test_ledger_path_tilde_is_expanded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[ledger]\npath = \"~/somewhere/api_usage.json\"\n\n[provider]\nkind = \"mock\"\n",
    )
    .unwrap();

    let config = AppConfig::load(Some(path.to_str().unwrap())).unwrap();
    assert!(!config.ledger.path.starts_with('~'));
    assert!(config.ledger.path.ends_with("somewhere/api_usage.json"));
}

#[test]
fn test_persona_missing_model_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[provider]
kind = "mock"

[[personas]]
display_name = "Nobody"
model_id = " "
system_prompt = "..."
"#,
    )
    .unwrap();

    let err = AppConfig::load(Some(path.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, Error::ConfigValidation { .. }));
}

#[test]
fn test_persona_fields_are_required() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[[personas]]\ndisplay_name = \"Half\"\n").unwrap();

    let err = AppConfig::load(Some(path.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
}
