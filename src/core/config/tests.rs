use super::data::{Config, RevealSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};
use super::io::ConfigError;
use crate::reveal::RevealError;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn missing_file_loads_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = Config::load_from_path(&temp_dir.path().join("absent.toml")).expect("load failed");
    assert_eq!(config, Config::default());
    assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    assert_eq!(config.model(), DEFAULT_MODEL);
    assert!(config.markdown_enabled());
    assert_eq!(config.request_timeout(), Duration::from_secs(60));
}

#[test]
fn save_then_load_preserves_values() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        model: Some("local-model".to_string()),
        request_timeout_secs: Some(5),
        fallback_message: Some("No reply.".to_string()),
        extensions: vec!["inline_math".to_string()],
        reveal: RevealSettings {
            step: Some(3),
            interval_ms: None,
            suffix: Some("▌".to_string()),
        },
        ..Default::default()
    };
    config.save_to_path(&config_path).expect("save failed");

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded, config);
    assert_eq!(loaded.extension_set().len(), 1);

    let leftovers: Vec<_> = fs::read_dir(config_path.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "temp file left behind: {leftovers:?}");
}

#[test]
fn reveal_table_parses_and_validates() {
    let parsed: Config = toml::from_str(
        r#"
        model = "m"

        [reveal]
        step = 2
        interval_ms = 20
        "#,
    )
    .unwrap();
    let reveal = parsed.reveal.to_config().unwrap();
    assert_eq!(reveal.step, 2);
    assert_eq!(reveal.interval, Duration::from_millis(20));
    assert_eq!(reveal.suffix, None);

    let zero = RevealSettings {
        step: Some(0),
        ..Default::default()
    };
    assert_eq!(zero.to_config(), Err(RevealError::ZeroStep));
}

#[test]
fn invalid_toml_reports_parse_error_with_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "model = [unterminated").unwrap();

    match Config::load_from_path(&config_path) {
        Err(err @ ConfigError::Parse { .. }) => {
            assert!(err.to_string().starts_with("Failed to parse config at"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn set_and_unset_values_by_key() {
    let mut config = Config::default();
    config.set_value("markdown", "off").unwrap();
    config.set_value("reveal.interval_ms", "15").unwrap();
    config.set_value("extensions", "block_math, inline_math").unwrap();
    assert!(!config.markdown_enabled());
    assert_eq!(config.reveal.interval_ms, Some(15));
    assert_eq!(config.extensions, vec!["block_math", "inline_math"]);

    assert!(config.set_value("request_timeout_secs", "soon").is_err());
    assert!(config.set_value("extensions", "mermaid").is_err());
    assert!(config.set_value("theme", "dark").is_err());

    config.unset_value("markdown").unwrap();
    assert!(config.markdown_enabled());
}

#[test]
fn unknown_extension_names_are_skipped() {
    let config = Config {
        extensions: vec!["directive".to_string(), "nope".to_string()],
        ..Default::default()
    };
    let set = config.extension_set();
    assert_eq!(set.len(), 1);
    assert_eq!(set.iter().next().map(|ext| ext.name), Some("directive"));
}
