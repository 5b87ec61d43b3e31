//! Peer session registry.
//!
//! Tracks one session per remote participant from the join announcement (or
//! incoming offer) until the session closes, fails, or the participant
//! leaves. Entries for closed or failed sessions are removed as part of the
//! same step that observes the closure.

mod manager;
mod types;


pub use manager::PeerRegistry;
pub use types::{RegistryInput, RegistrySettings, SubstitutionReport};
