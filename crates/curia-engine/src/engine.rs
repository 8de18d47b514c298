//! [`CompositionEngine`] — validates and mutates seat assignments, manages
//! the term lifecycle, and computes composition snapshots.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use curia_core::{
  Error, Result,
  assignment::{Assignment, AssignmentPatch, NewAssignment},
  catalog::PositionKind,
  composition::{Composition, CompositionDetail, SeatDetail},
  member::{Member, PositionCache},
  store::{Conflict, MemberDirectory, PositionStore, StoreError, TermStore},
  term::{NewTerm, Term, TermPatch},
};

/// The invariant-enforcing core of the council subsystem.
///
/// Stateless between calls: every read re-queries the collaborators, so any
/// number of engine instances can run concurrently against one store. The
/// engine pre-checks capacity and duplicate seats for precise errors; the
/// store's constraint backstops catch writers that race past a pre-check,
/// and their conflicts are mapped back to the same error variants.
pub struct CompositionEngine<T, P, D> {
  terms:     Arc<T>,
  positions: Arc<P>,
  members:   Arc<D>,
}

impl<T, P, D> Clone for CompositionEngine<T, P, D> {
  fn clone(&self) -> Self {
    Self {
      terms:     self.terms.clone(),
      positions: self.positions.clone(),
      members:   self.members.clone(),
    }
  }
}

impl<S> CompositionEngine<S, S, S>
where
  S: TermStore + PositionStore + MemberDirectory,
{
  /// Build an engine over one backend serving as all three collaborators.
  pub fn from_shared(store: Arc<S>) -> Self {
    Self {
      terms:     store.clone(),
      positions: store.clone(),
      members:   store,
    }
  }
}

impl<T, P, D> CompositionEngine<T, P, D>
where
  T: TermStore,
  P: PositionStore,
  D: MemberDirectory,
{
  pub fn new(terms: Arc<T>, positions: Arc<P>, members: Arc<D>) -> Self {
    Self { terms, positions, members }
  }

  // ── Term lifecycle ────────────────────────────────────────────────────

  /// Create a term. An active term displaces every other term's flag;
  /// other terms are deactivated first, so a partial failure can leave
  /// zero active terms but never two.
  pub async fn create_term(&self, input: NewTerm) -> Result<Term> {
    input.validate()?;
    if input.is_active {
      self.terms.deactivate_terms_except(None).await?;
    }
    let term = self.terms.insert_term(input).await?;
    tracing::info!(term = %term.name, active = term.is_active, "created term");
    Ok(term)
  }

  /// Apply a partial update. Activating through the patch is exclusive,
  /// exactly as in [`Self::activate_term`].
  pub async fn update_term(&self, term_id: Uuid, patch: TermPatch) -> Result<Term> {
    self
      .terms
      .term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;

    if patch.is_active == Some(true) {
      self.terms.deactivate_terms_except(Some(term_id)).await?;
    }
    let term = self
      .terms
      .update_term(term_id, patch)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;
    tracing::info!(term = %term.name, "updated term");
    Ok(term)
  }

  /// Make `term_id` the single active term. Others are deactivated first,
  /// so a partial failure can leave zero active terms but never two.
  pub async fn activate_term(&self, term_id: Uuid) -> Result<Term> {
    self
      .terms
      .term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;

    self.terms.deactivate_terms_except(Some(term_id)).await?;
    if !self.terms.set_term_active(term_id, true).await? {
      return Err(Error::TermNotFound(term_id));
    }
    let term = self
      .terms
      .term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;
    tracing::info!(term = %term.name, "activated term");
    Ok(term)
  }

  pub async fn deactivate_term(&self, term_id: Uuid) -> Result<Term> {
    if !self.terms.set_term_active(term_id, false).await? {
      return Err(Error::TermNotFound(term_id));
    }
    let term = self
      .terms
      .term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;
    tracing::info!(term = %term.name, "deactivated term");
    Ok(term)
  }

  pub async fn term(&self, term_id: Uuid) -> Result<Term> {
    self
      .terms
      .term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))
  }

  pub async fn active_term(&self) -> Result<Term> {
    self.terms.active_term().await?.ok_or(Error::NoActiveTerm)
  }

  pub async fn list_terms(&self) -> Result<Vec<Term>> {
    Ok(self.terms.list_terms().await?)
  }

  // ── Seat assignment ───────────────────────────────────────────────────

  /// Appoint a member to a council seat for a term.
  ///
  /// `start_date` defaults to now. The created assignment is active with an
  /// open-ended tenure. The member's cached position is refreshed after the
  /// assignment commits; if that refresh fails the assignment stands and
  /// the error reports the cache as stale (see
  /// [`Self::reconcile_member_cache`]).
  pub async fn assign_position(
    &self,
    term_id: Uuid,
    member_id: Uuid,
    kind: PositionKind,
    start_date: Option<DateTime<Utc>>,
  ) -> Result<Assignment> {
    if !kind.is_council_seat() {
      return Err(Error::NotCouncilSeat(kind));
    }

    let term = self
      .terms
      .term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;
    let member = self
      .members
      .member(member_id)
      .await?
      .ok_or(Error::MemberNotFound(member_id))?;

    if let Some(capacity) = kind.capacity() {
      let held = self.positions.count_active(term_id, kind).await?;
      if held >= capacity {
        return Err(Error::CapacityExceeded { kind, capacity });
      }
    }

    if self
      .positions
      .active_for_member(term_id, member_id)
      .await?
      .is_some()
    {
      return Err(Error::DuplicateActiveAssignment { member_id, term_id });
    }

    let assignment = self
      .positions
      .insert_assignment(NewAssignment {
        member_id,
        term_id,
        kind,
        start_date: start_date.unwrap_or_else(Utc::now),
      })
      .await
      .map_err(|e| Self::seat_conflict(e, member_id, term_id))?;

    let cache = PositionCache::seated(kind, assignment.assignment_id);
    if let Err(source) = self.members.set_position_cache(member_id, cache).await
    {
      return Err(Error::MemberCacheStale {
        assignment_id: assignment.assignment_id,
        source,
      });
    }

    tracing::info!(
      term = %term.name,
      member = %member.full_name,
      seat = %kind,
      "assigned council seat"
    );
    Ok(assignment)
  }

  /// Vacate a seat: the assignment is deactivated first (end date = now),
  /// then the member's cache is reset, so a concurrent composition read
  /// never sees an active assignment whose member cache already says
  /// non-council.
  ///
  /// Removing an already-vacated seat is a no-op and returns `Ok(None)`.
  pub async fn remove_position(
    &self,
    position_id: Uuid,
  ) -> Result<Option<Assignment>> {
    let assignment = self
      .positions
      .assignment(position_id)
      .await?
      .ok_or(Error::PositionNotFound(position_id))?;

    if !assignment.is_active {
      return Ok(None);
    }

    let closed = self
      .positions
      .deactivate_assignment(position_id, Utc::now())
      .await?
      .ok_or(Error::PositionNotFound(position_id))?;

    if let Err(source) = self
      .members
      .set_position_cache(assignment.member_id, PositionCache::non_council())
      .await
    {
      return Err(Error::MemberCacheStale { assignment_id: position_id, source });
    }

    tracing::info!(
      assignment = %position_id,
      seat = %assignment.kind,
      "removed council seat"
    );
    Ok(Some(closed))
  }

  /// Modify an assignment's mutable fields. Changing the seat kind of an
  /// active assignment is equivalent to a remove-plus-assign, so capacity
  /// is re-validated and the member's cached label is rewritten.
  pub async fn update_position(
    &self,
    position_id: Uuid,
    patch: AssignmentPatch,
  ) -> Result<Assignment> {
    let existing = self
      .positions
      .assignment(position_id)
      .await?
      .ok_or(Error::PositionNotFound(position_id))?;

    if let Some(kind) = patch.kind
      && kind != existing.kind
    {
      if !kind.is_council_seat() {
        return Err(Error::NotCouncilSeat(kind));
      }
      if existing.is_active
        && let Some(capacity) = kind.capacity()
      {
        let held = self.positions.count_active(existing.term_id, kind).await?;
        if held >= capacity {
          return Err(Error::CapacityExceeded { kind, capacity });
        }
      }
    }

    let updated = self
      .positions
      .update_assignment(position_id, patch)
      .await
      .map_err(|e| Self::seat_conflict(e, existing.member_id, existing.term_id))?
      .ok_or(Error::PositionNotFound(position_id))?;

    if updated.is_active && updated.kind != existing.kind {
      let cache = PositionCache::seated(updated.kind, updated.assignment_id);
      if let Err(source) =
        self.members.set_position_cache(updated.member_id, cache).await
      {
        return Err(Error::MemberCacheStale {
          assignment_id: updated.assignment_id,
          source,
        });
      }
    }

    tracing::info!(assignment = %position_id, "updated council seat");
    Ok(updated)
  }

  pub async fn position(&self, position_id: Uuid) -> Result<Assignment> {
    self
      .positions
      .assignment(position_id)
      .await?
      .ok_or(Error::PositionNotFound(position_id))
  }

  // ── Queries ───────────────────────────────────────────────────────────

  /// Whether `kind` still has a free slot in the term. Pure read.
  pub async fn validate_position_availability(
    &self,
    term_id: Uuid,
    kind: PositionKind,
  ) -> Result<bool> {
    match kind.capacity() {
      None => Ok(true),
      Some(capacity) => {
        let held = self.positions.count_active(term_id, kind).await?;
        Ok(held < capacity)
      }
    }
  }

  /// Remaining slots for every council seat, in priority order.
  pub async fn available_positions(
    &self,
    term_id: Uuid,
  ) -> Result<BTreeMap<PositionKind, u32>> {
    let mut available = BTreeMap::new();
    for kind in PositionKind::council_seats() {
      // every council seat has a finite capacity
      let capacity = kind.capacity().unwrap_or(0);
      let held = self.positions.count_active(term_id, kind).await?;
      available.insert(kind, capacity.saturating_sub(held));
    }
    Ok(available)
  }

  /// The current occupants of every seat in a term.
  pub async fn composition(&self, term_id: Uuid) -> Result<Composition> {
    let assignments = self.positions.assignments_for_term(term_id, true).await?;
    Ok(Composition::from_active(term_id, assignments))
  }

  /// The composition joined to member records, over the term's full
  /// assignment history. An assignment whose member is missing from the
  /// directory is skipped rather than failing the whole snapshot.
  pub async fn composition_with_details(
    &self,
    term_id: Uuid,
  ) -> Result<CompositionDetail> {
    let term = self
      .terms
      .term(term_id)
      .await?
      .ok_or(Error::TermNotFound(term_id))?;

    let assignments =
      self.positions.assignments_for_term(term_id, false).await?;

    let mut detail = CompositionDetail::new(term_id, term.name);
    for assignment in assignments {
      let Some(member) = self.members.member(assignment.member_id).await?
      else {
        tracing::warn!(
          assignment = %assignment.assignment_id,
          member = %assignment.member_id,
          "skipping seat with unresolved member"
        );
        continue;
      };
      detail.add(SeatDetail { assignment, member });
    }
    Ok(detail)
  }

  /// A member's full assignment history, newest first. History survives
  /// the member's directory record.
  pub async fn member_history(&self, member_id: Uuid) -> Result<Vec<Assignment>> {
    Ok(self.positions.assignments_for_member(member_id).await?)
  }

  /// Recompute the member's cached position purely from assignment
  /// records: the newest active assignment wins, none means non-council.
  /// Repairs drift left behind by a partial failure.
  pub async fn reconcile_member_cache(&self, member_id: Uuid) -> Result<Member> {
    self
      .members
      .member(member_id)
      .await?
      .ok_or(Error::MemberNotFound(member_id))?;

    let history = self.positions.assignments_for_member(member_id).await?;
    let cache = history
      .iter()
      .find(|a| a.is_active)
      .map(|a| PositionCache::seated(a.kind, a.assignment_id))
      .unwrap_or_else(PositionCache::non_council);

    self.members.set_position_cache(member_id, cache).await?;
    let member = self
      .members
      .member(member_id)
      .await?
      .ok_or(Error::MemberNotFound(member_id))?;
    tracing::info!(member = %member.full_name, "reconciled member cache");
    Ok(member)
  }

  // ── Internal ──────────────────────────────────────────────────────────

  /// Map a store conflict raised by a racing writer onto the same error
  /// the pre-check would have produced.
  fn seat_conflict(e: StoreError, member_id: Uuid, term_id: Uuid) -> Error {
    match e {
      StoreError::Conflict(Conflict::SeatCapacity { kind }) => {
        Error::CapacityExceeded {
          kind,
          capacity: kind.capacity().unwrap_or(0),
        }
      }
      StoreError::Conflict(Conflict::DuplicateActiveAssignment) => {
        Error::DuplicateActiveAssignment { member_id, term_id }
      }
      other => Error::Store(other),
    }
  }
}
