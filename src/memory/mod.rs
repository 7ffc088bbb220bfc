//! Conversational memory
//!
//! Per-user bounded exchange history with lazy expiry and whole-store
//! JSON snapshots.

pub mod persist;
pub mod store;
pub mod types;

pub use persist::{JsonFilePersistence, MemoryPersistence, NullPersistence};
pub use store::{MemorySettings, MemoryStore};
pub use types::{Exchange, MemorySnapshot, UserMemory};

/// Current wall-clock time in fractional Unix seconds
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
