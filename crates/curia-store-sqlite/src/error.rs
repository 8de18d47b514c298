//! Error type for `curia-store-sqlite`.

use curia_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant no longer matches the catalog.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Backend faults cross the store seam as [`StoreError::Unavailable`];
/// constraint conflicts are decoded separately in `store.rs` before this
/// conversion applies.
impl From<Error> for StoreError {
  fn from(e: Error) -> Self { StoreError::unavailable(e) }
}
