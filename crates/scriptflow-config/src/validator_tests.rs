use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_base_delay_above_max() {
    let mut config = Config::default();
    config.playback.retry_base_delay_ms = 2000;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "playback.retry_base_delay_ms"));
}

#[test]
fn test_validate_zero_timeout_warning() {
    let mut config = Config::default();
    config.playback.retry_timeout_ms = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.path == "playback.retry_timeout_ms"));
}

#[test]
fn test_validate_backoff_multiplier() {
    let mut config = Config::default();
    config.playback.backoff_multiplier = 0.5;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
}

#[test]
fn test_validate_empty_default_context() {
    let mut config = Config::default();
    config.playback.default_context = String::new();

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "playback.default_context"));
}

#[test]
fn test_validate_empty_rename_target() {
    let mut config = Config::default();
    config
        .resolver
        .renames
        .insert("Old.type".to_string(), String::new());

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.errors[0].path, "resolver.renames.Old.type");
}

#[test]
fn test_validate_rename_chain() {
    let mut config = Config::default();
    config
        .resolver
        .renames
        .insert("A.one".to_string(), "B.two".to_string());
    config
        .resolver
        .renames
        .insert("B.two".to_string(), "C.three".to_string());

    let result = ConfigValidator::validate(&config).unwrap();
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("B.two"));
}

#[test]
fn test_validate_unknown_log_level() {
    let mut config = Config::default();
    config.logging.level = "loud".to_string();

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_into_error() {
    let mut config = Config::default();
    config.playback.retry_base_delay_ms = 5000;

    let result = ConfigValidator::validate(&config).unwrap();
    let err = result.into_error().unwrap();
    assert!(matches!(err, ConfigError::Invalid { others: 0, .. }));
    assert_eq!(err.field(), Some("playback.retry_base_delay_ms"));

    let mut config = Config::default();
    config.playback.retry_base_delay_ms = 5000;
    config.playback.backoff_multiplier = 0.5;
    config.playback.default_context = String::new();
    let err = ConfigValidator::validate(&config).unwrap().into_error().unwrap();
    assert!(matches!(err, ConfigError::Invalid { others: 2, .. }));
    assert!(err.to_string().ends_with("(and 2 more errors)"));

    let ok = ConfigValidator::validate(&Config::default()).unwrap();
    assert!(ok.into_error().is_none());
}
