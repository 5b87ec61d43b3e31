//! Call coordination.
//!
//! [`CallCoordinator::start`] joins the room and spawns a single event loop
//! that owns the local media source and the peer registry. Relay events,
//! incoming offers, registry inputs and user commands are all processed on
//! that loop, one at a time.

mod handle;
mod runner;
mod types;


pub use handle::CallHandle;
pub use runner::CallCoordinator;
pub use types::{CallChannels, CallCommand, CallSettings, PeerSummary};
