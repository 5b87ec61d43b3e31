pub mod errors;
pub mod id;

pub use errors::{CallError, ConfigError, MediaAccessError, NegotiationError, SignalingError};
pub use id::{new_id, ParticipantId};

pub type Result<T> = std::result::Result<T, CallError>;
