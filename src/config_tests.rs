use super::*;
use tempfile::tempdir;

#[test]
fn test_load_creates_default_file() {
    let dir = tempdir().unwrap();
    let config = BridgeConfig::load(dir.path());

    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.max_redirects, 10);
    assert_eq!(config.database_path, dir.path().join(DB_FILE_NAME));
    assert!(dir.path().join(CONFIG_FILE_NAME).exists());
}

#[test]
fn test_load_round_trips_saved_values() {
    let dir = tempdir().unwrap();
    let config = BridgeConfig {
        database_path: dir.path().join("other.db"),
        request_timeout_secs: 12,
        ..BridgeConfig::default()
    };
    config.save(dir.path()).unwrap();

    let loaded = BridgeConfig::load(dir.path());
    assert_eq!(loaded.request_timeout_secs, 12);
    assert_eq!(loaded.database_path, dir.path().join("other.db"));
}

#[test]
fn test_corrupt_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ nope").unwrap();

    let config = BridgeConfig::load(dir.path());
    assert_eq!(config.request_timeout_secs, 30);
}

#[test]
fn test_missing_optional_keys_use_defaults() {
    let config: BridgeConfig =
        serde_json::from_str(r#"{"database_path": "/tmp/x.db", "unknown": true}"#).unwrap();
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.max_redirects, 10);
    assert!(config.pinned_credentials().is_none());
}

#[test]
fn test_pinned_credentials_need_both_halves() {
    let mut config = BridgeConfig {
        api_url: "https://acct.example.com".to_string(),
        ..BridgeConfig::default()
    };
    assert!(config.pinned_credentials().is_none());

    config.api_key = "secret".to_string();
    assert_eq!(
        config.pinned_credentials(),
        Some(("https://acct.example.com", "secret"))
    );
}

#[test]
fn test_zero_timeout_falls_back_to_default() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{"database_path": "/tmp/x.db", "request_timeout_secs": 0}"#,
    )
    .unwrap();

    let config = BridgeConfig::load(dir.path());
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
}

#[test]
fn test_request_timeout_never_zero() {
    let mut config = BridgeConfig {
        request_timeout_secs: 0,
        ..BridgeConfig::default()
    };
    assert_eq!(config.request_timeout(), Duration::from_secs(30));

    config.request_timeout_secs = 5;
    assert_eq!(config.request_timeout(), Duration::from_secs(5));
}
