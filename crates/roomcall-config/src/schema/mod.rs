//! Configuration schema.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod call;
mod chat;
mod ice;
mod logging;
mod relay;

use serde::{Deserialize, Serialize};

pub use call::*;
pub use chat::*;
pub use ice::*;
pub use logging::*;
pub use relay::*;

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomcallConfig {
    pub relay: RelayConfig,
    pub call: CallConfig,
    pub ice: IceConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}
