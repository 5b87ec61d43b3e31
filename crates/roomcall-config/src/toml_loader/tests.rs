//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_roomcall_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, roomcall_common::ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[relay]
url = "wss://relay.example.org/ws"

[call]
initiate_delay_ms = 250
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.relay.url, "wss://relay.example.org/ws");
    assert_eq!(config.call.initiate_delay_ms, 250);
    // Defaults preserved
    assert_eq!(config.call.negotiation_timeout_secs, 30);
    assert_eq!(config.relay.heartbeat_interval_secs, 25);
    assert_eq!(config.chat.max_messages, 500);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, roomcall_common::ConfigError::ParseError(_)));
}

#[test]
fn out_of_range_values_are_returned_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[call]\nnegotiation_timeout_secs = 0\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.call.negotiation_timeout_secs, 0);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roomcall").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.call.initiate_delay_ms, 1000);
    assert_eq!(config.ice.stun_servers.len(), 2);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::RoomcallConfig;

    let config: RoomcallConfig = toml::from_str(&default_config_toml()).unwrap();
    assert_eq!(config.logging.level, "info");
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("roomcall"));
        assert!(path_str.ends_with("config.toml"));
    }
}
