//! roomcall configuration system.
//!
//! TOML-based configuration with validation. All sections use sensible
//! defaults so partial configs work out of the box.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{RoomcallConfig, CONFIG_SCHEMA_VERSION};

use std::path::Path;

use roomcall_common::ConfigError;

/// Load config from the platform default path, creating it if missing, and
/// validate the result.
pub fn load_config() -> Result<RoomcallConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<RoomcallConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &RoomcallConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&RoomcallConfig::default());
        assert!(json.contains("\"relay\""));
        assert!(json.contains("\"call\""));
        assert!(json.contains("\"ice\""));
        assert!(json.contains("\"chat\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn call_durations_follow_fields() {
        let config = RoomcallConfig::default();
        assert_eq!(config.call.initiate_delay(), Duration::from_millis(1000));
        assert_eq!(config.call.negotiation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn load_config_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[call]\nmax_participants = 100\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
