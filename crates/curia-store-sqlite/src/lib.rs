//! SQLite backend for the curia council store.
//!
//! Implements all three store traits over a single [`tokio_rusqlite`]
//! connection, so database access runs on a dedicated thread without
//! blocking the async runtime. The schema carries database-level backstops
//! for the invariants the engine pre-checks: seat capacity, one active
//! seat per member per term, and one active term system-wide.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
