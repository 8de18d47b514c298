//! Error types for `curia-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{catalog::PositionKind, store::StoreError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("term not found: {0}")]
  TermNotFound(Uuid),

  #[error("member not found: {0}")]
  MemberNotFound(Uuid),

  #[error("position not found: {0}")]
  PositionNotFound(Uuid),

  #[error("no active term")]
  NoActiveTerm,

  #[error("no available slots for {kind} (capacity {capacity})")]
  CapacityExceeded { kind: PositionKind, capacity: u32 },

  #[error("member {member_id} already holds an active seat in term {term_id}")]
  DuplicateActiveAssignment { member_id: Uuid, term_id: Uuid },

  #[error("{0} is not an assignable council seat")]
  NotCouncilSeat(PositionKind),

  #[error("invalid term: {0}")]
  InvalidTerm(String),

  /// The assignment write committed but the member's cached position could
  /// not be updated. The cache is stale until reconciled.
  #[error("assignment {assignment_id} committed but the member cache update failed")]
  MemberCacheStale {
    assignment_id: Uuid,
    #[source]
    source:        StoreError,
  },

  #[error("store error: {0}")]
  Store(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
