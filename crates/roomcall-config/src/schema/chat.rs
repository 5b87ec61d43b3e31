use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Messages kept in memory before the oldest are evicted.
    pub max_messages: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_messages: 500 }
    }
}
