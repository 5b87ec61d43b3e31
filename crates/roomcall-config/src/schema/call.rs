use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Peer session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Fixed back-off between learning of a joiner and sending it an offer.
    pub initiate_delay_ms: u32,
    /// A session still connecting after this many seconds is failed.
    pub negotiation_timeout_secs: u32,
    pub max_participants: u32,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            initiate_delay_ms: 1000,
            negotiation_timeout_secs: 30,
            max_participants: 8,
        }
    }
}

impl CallConfig {
    pub fn initiate_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.initiate_delay_ms))
    }

    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.negotiation_timeout_secs))
    }
}
