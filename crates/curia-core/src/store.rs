//! Store traits — the persistence seams the engine depends on.
//!
//! Implemented by storage backends (e.g. `curia-store-sqlite`) and by fakes
//! in tests. The engine depends on these abstractions, never on a concrete
//! backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  assignment::{Assignment, AssignmentPatch, NewAssignment},
  catalog::PositionKind,
  member::{Member, NewMember, PositionCache},
  term::{NewTerm, Term, TermPatch},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// An invariant backstop fired inside the store.
///
/// Conflicts are terminal for the request that raised them: the engine's
/// pre-checks catch the common path, and the backstop catches writers that
/// raced past a pre-check. Either way the final persisted state holds the
/// invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
  /// An insert or update would push a seat past its capacity.
  #[error("no remaining capacity for {kind}")]
  SeatCapacity { kind: PositionKind },

  /// The member already holds an active seat in the term.
  #[error("member already holds an active seat in this term")]
  DuplicateActiveAssignment,

  /// A different term is already active.
  #[error("another term is already active")]
  ActiveTermExists,
}

/// Error type shared by every store trait.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error(transparent)]
  Conflict(#[from] Conflict),

  /// The backend failed. No partial state was committed; the whole
  /// operation is safe to retry from the top.
  #[error("store unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
  pub fn unavailable(
    source: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Unavailable(Box::new(source))
  }
}

// ─── TermStore ───────────────────────────────────────────────────────────────

/// Persistence of council terms.
pub trait TermStore: Send + Sync {
  /// Persist a new term. The id and audit timestamps are store-assigned.
  fn insert_term(
    &self,
    input: NewTerm,
  ) -> impl Future<Output = Result<Term, StoreError>> + Send + '_;

  /// Retrieve a term by id. Returns `None` if not found.
  fn term(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Term>, StoreError>> + Send + '_;

  /// The currently active term, if any.
  fn active_term(
    &self,
  ) -> impl Future<Output = Result<Option<Term>, StoreError>> + Send + '_;

  /// All terms, newest start date first.
  fn list_terms(
    &self,
  ) -> impl Future<Output = Result<Vec<Term>, StoreError>> + Send + '_;

  /// Apply a partial update. Returns the updated term, or `None` if the id
  /// does not exist.
  fn update_term(
    &self,
    id: Uuid,
    patch: TermPatch,
  ) -> impl Future<Output = Result<Option<Term>, StoreError>> + Send + '_;

  /// Flip a term's active flag. Returns `false` if the id does not exist.
  fn set_term_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<bool, StoreError>> + Send + '_;

  /// Clear the active flag on every term except `keep` (on every term when
  /// `None`). Returns how many terms were deactivated.
  fn deactivate_terms_except(
    &self,
    keep: Option<Uuid>,
  ) -> impl Future<Output = Result<u64, StoreError>> + Send + '_;
}

// ─── PositionStore ───────────────────────────────────────────────────────────

/// Persistence of seat assignment records.
pub trait PositionStore: Send + Sync {
  /// Persist a new assignment (active, open-ended). The store's invariant
  /// backstops may reject the write with a [`Conflict`].
  fn insert_assignment(
    &self,
    input: NewAssignment,
  ) -> impl Future<Output = Result<Assignment, StoreError>> + Send + '_;

  /// Retrieve an assignment by id. Returns `None` if not found.
  fn assignment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, StoreError>> + Send + '_;

  /// Count the active assignments of one kind within a term.
  fn count_active(
    &self,
    term_id: Uuid,
    kind: PositionKind,
  ) -> impl Future<Output = Result<u32, StoreError>> + Send + '_;

  /// The member's active assignment in a term, if any.
  fn active_for_member(
    &self,
    term_id: Uuid,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, StoreError>> + Send + '_;

  /// Apply a partial update to an assignment's mutable fields. Returns the
  /// updated record, or `None` if the id does not exist.
  fn update_assignment(
    &self,
    id: Uuid,
    patch: AssignmentPatch,
  ) -> impl Future<Output = Result<Option<Assignment>, StoreError>> + Send + '_;

  /// Mark an assignment inactive and close its tenure at `end_date`.
  /// Returns the updated record, or `None` if the id does not exist.
  fn deactivate_assignment(
    &self,
    id: Uuid,
    end_date: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Assignment>, StoreError>> + Send + '_;

  /// All assignments for a term, optionally restricted to active ones.
  fn assignments_for_term(
    &self,
    term_id: Uuid,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Assignment>, StoreError>> + Send + '_;

  /// A member's full assignment history, newest start date first.
  fn assignments_for_member(
    &self,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, StoreError>> + Send + '_;
}

// ─── MemberDirectory ─────────────────────────────────────────────────────────

/// Lookup of member records. The engine reads members and writes only the
/// denormalised council cache; everything else about a member belongs to
/// the directory's owner.
pub trait MemberDirectory: Send + Sync {
  /// Register a member. New members start outside the council.
  fn insert_member(
    &self,
    input: NewMember,
  ) -> impl Future<Output = Result<Member, StoreError>> + Send + '_;

  /// Retrieve a member by id. Returns `None` if not found.
  fn member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, StoreError>> + Send + '_;

  /// All members, in registration order.
  fn list_members(
    &self,
  ) -> impl Future<Output = Result<Vec<Member>, StoreError>> + Send + '_;

  /// Overwrite a member's cached council projection. Returns `false` if
  /// the member does not exist.
  fn set_position_cache(
    &self,
    member_id: Uuid,
    cache: PositionCache,
  ) -> impl Future<Output = Result<bool, StoreError>> + Send + '_;
}
