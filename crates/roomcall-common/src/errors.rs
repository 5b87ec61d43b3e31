use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failure to obtain a local capture device.
///
/// Fatal to the feature being attempted, never to the call as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaAccessError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device found: {0}")]
    DeviceNotFound(String),

    #[error("capture cancelled by user")]
    Cancelled,

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("device error: {0}")]
    Device(String),
}

/// Failure of a single peer session's negotiation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    #[error("negotiation timed out after {0}s")]
    Timeout(u64),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("session closed before negotiation completed")]
    Closed,

    #[error("negotiator is not open")]
    NotOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalingError {
    #[error("relay disconnected")]
    Disconnected,

    #[error("relay connection timed out after {0}s")]
    ConnectTimeout(u64),

    #[error("relay connection failed: {0}")]
    Connect(String),

    #[error("failed to encode relay frame: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Media(#[from] MediaAccessError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
