use serde::{Deserialize, Serialize};

/// Connection settings for the signaling relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket URL of the relay.
    pub url: String,
    /// Seconds to wait for the WebSocket handshake.
    pub connect_timeout_secs: u32,
    pub heartbeat_interval_secs: u32,
    /// Reconnect delay (base) in seconds.
    pub reconnect_delay_secs: u32,
    pub max_reconnect_delay_secs: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000/ws".into(),
            connect_timeout_secs: 15,
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
        }
    }
}
