//! Full configuration validation.
//!
//! Validates numeric ranges and URL schemes, collecting every problem.

use crate::schema::RoomcallConfig;
use roomcall_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RoomcallConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    if !(config.relay.url.starts_with("ws://") || config.relay.url.starts_with("wss://")) {
        errors.push(format!(
            "relay.url = {:?} must start with ws:// or wss://",
            config.relay.url
        ));
    }
    validate_range(
        &mut errors,
        "relay.connect_timeout_secs",
        config.relay.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        &mut errors,
        "relay.heartbeat_interval_secs",
        config.relay.heartbeat_interval_secs,
        5,
        300,
    );
    validate_range(
        &mut errors,
        "relay.reconnect_delay_secs",
        config.relay.reconnect_delay_secs,
        1,
        60,
    );
    if config.relay.max_reconnect_delay_secs < config.relay.reconnect_delay_secs {
        errors.push(format!(
            "relay.max_reconnect_delay_secs = {} is below relay.reconnect_delay_secs = {}",
            config.relay.max_reconnect_delay_secs, config.relay.reconnect_delay_secs
        ));
    }

    validate_range(&mut errors, "call.initiate_delay_ms", config.call.initiate_delay_ms, 0, 10_000);
    validate_range(
        &mut errors,
        "call.negotiation_timeout_secs",
        config.call.negotiation_timeout_secs,
        1,
        300,
    );
    validate_range(&mut errors, "call.max_participants", config.call.max_participants, 2, 32);

    for server in &config.ice.stun_servers {
        let known_scheme = ["stun:", "turn:", "turns:"]
            .iter()
            .any(|scheme| server.starts_with(scheme));
        if !known_scheme {
            errors.push(format!("ice.stun_servers entry {server:?} has no stun:/turn: scheme"));
        }
    }

    validate_range(&mut errors, "chat.max_messages", config.chat.max_messages, 10, 10_000);

    if !matches!(
        config.logging.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(format!("logging.level = {:?} is not a known level", config.logging.level));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}
