//! Composition snapshots — the derived, read-only view of who holds each
//! seat in a term. Never persisted, always recomputed from assignments.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{assignment::Assignment, catalog::PositionKind, member::Member};

// ─── Composition ─────────────────────────────────────────────────────────────

/// The occupants of every seat in a term, built from active assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
  pub term_id:         Uuid,
  pub president:       Option<Assignment>,
  pub vice_president:  Option<Assignment>,
  pub treasurer:       Option<Assignment>,
  pub secretary:       Option<Assignment>,
  pub board_members:   Vec<Assignment>,
  pub total_positions: usize,
}

impl Composition {
  /// Bucket a term's active assignments into their seats.
  pub fn from_active(term_id: Uuid, assignments: Vec<Assignment>) -> Self {
    let mut comp = Self {
      term_id,
      president: None,
      vice_president: None,
      treasurer: None,
      secretary: None,
      board_members: Vec::new(),
      total_positions: assignments.len(),
    };

    for assignment in assignments {
      match assignment.kind {
        PositionKind::President => comp.president = Some(assignment),
        PositionKind::VicePresident => comp.vice_president = Some(assignment),
        PositionKind::Treasurer => comp.treasurer = Some(assignment),
        PositionKind::Secretary => comp.secretary = Some(assignment),
        PositionKind::BoardMember => comp.board_members.push(assignment),
        // ordinary membership never occupies a seat
        PositionKind::NonCouncil => comp.total_positions -= 1,
      }
    }

    comp
  }

  /// How many seats of `kind` are occupied in this snapshot.
  pub fn occupied(&self, kind: PositionKind) -> usize {
    match kind {
      PositionKind::President => usize::from(self.president.is_some()),
      PositionKind::VicePresident => {
        usize::from(self.vice_president.is_some())
      }
      PositionKind::Treasurer => usize::from(self.treasurer.is_some()),
      PositionKind::Secretary => usize::from(self.secretary.is_some()),
      PositionKind::BoardMember => self.board_members.len(),
      PositionKind::NonCouncil => 0,
    }
  }

  /// Remaining slots for a seat kind; `None` when capacity is unlimited.
  pub fn remaining_slots(&self, kind: PositionKind) -> Option<u32> {
    kind
      .capacity()
      .map(|max| max.saturating_sub(self.occupied(kind) as u32))
  }

  /// Human-readable list of what a full council is still missing.
  /// Empty when every seat is filled.
  pub fn vacancies(&self) -> Vec<String> {
    let mut gaps = Vec::new();
    for kind in PositionKind::council_seats() {
      let open = self.remaining_slots(kind).unwrap_or(0);
      if open > 0 {
        gaps.push(format!("{open} open {kind} seat(s)"));
      }
    }
    gaps
  }
}

// ─── Detailed composition ────────────────────────────────────────────────────

/// An assignment joined to its member record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatDetail {
  pub assignment: Assignment,
  pub member:     Member,
}

/// [`Composition`] enriched with the term name and member records.
///
/// Built over the term's full assignment history; a singular seat shows its
/// active occupant when one exists, historical board rows stay in the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionDetail {
  pub term_id:         Uuid,
  pub term_name:       String,
  pub president:       Option<SeatDetail>,
  pub vice_president:  Option<SeatDetail>,
  pub treasurer:       Option<SeatDetail>,
  pub secretary:       Option<SeatDetail>,
  pub board_members:   Vec<SeatDetail>,
  pub total_positions: usize,
}

impl CompositionDetail {
  pub fn new(term_id: Uuid, term_name: String) -> Self {
    Self {
      term_id,
      term_name,
      president: None,
      vice_president: None,
      treasurer: None,
      secretary: None,
      board_members: Vec::new(),
      total_positions: 0,
    }
  }

  /// Place one joined entry into its seat.
  pub fn add(&mut self, seat: SeatDetail) {
    match seat.assignment.kind {
      PositionKind::President => Self::fill(&mut self.president, seat),
      PositionKind::VicePresident => {
        Self::fill(&mut self.vice_president, seat)
      }
      PositionKind::Treasurer => Self::fill(&mut self.treasurer, seat),
      PositionKind::Secretary => Self::fill(&mut self.secretary, seat),
      PositionKind::BoardMember => self.board_members.push(seat),
      PositionKind::NonCouncil => return,
    }
    self.total_positions += 1;
  }

  /// A singular seat keeps its active occupant; a historical entry only
  /// fills a seat nobody currently holds.
  fn fill(slot: &mut Option<SeatDetail>, seat: SeatDetail) {
    if seat.assignment.is_active || slot.is_none() {
      *slot = Some(seat);
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::Composition;
  use crate::{assignment::Assignment, catalog::PositionKind};

  fn assignment(term_id: Uuid, kind: PositionKind) -> Assignment {
    let now = Utc::now();
    Assignment {
      assignment_id: Uuid::new_v4(),
      member_id: Uuid::new_v4(),
      term_id,
      kind,
      start_date: now,
      end_date: None,
      is_active: true,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn buckets_by_kind() {
    let term_id = Uuid::new_v4();
    let comp = Composition::from_active(term_id, vec![
      assignment(term_id, PositionKind::President),
      assignment(term_id, PositionKind::BoardMember),
      assignment(term_id, PositionKind::BoardMember),
      assignment(term_id, PositionKind::Secretary),
    ]);

    assert!(comp.president.is_some());
    assert!(comp.vice_president.is_none());
    assert!(comp.secretary.is_some());
    assert_eq!(comp.board_members.len(), 2);
    assert_eq!(comp.total_positions, 4);
  }

  #[test]
  fn remaining_slots_counts_down() {
    let term_id = Uuid::new_v4();
    let comp = Composition::from_active(term_id, vec![
      assignment(term_id, PositionKind::President),
      assignment(term_id, PositionKind::BoardMember),
    ]);

    assert_eq!(comp.remaining_slots(PositionKind::President), Some(0));
    assert_eq!(comp.remaining_slots(PositionKind::BoardMember), Some(5));
    assert_eq!(comp.remaining_slots(PositionKind::Treasurer), Some(1));
    assert_eq!(comp.remaining_slots(PositionKind::NonCouncil), None);
  }

  #[test]
  fn vacancies_name_every_open_seat() {
    let term_id = Uuid::new_v4();
    let comp = Composition::from_active(term_id, vec![assignment(
      term_id,
      PositionKind::President,
    )]);

    let gaps = comp.vacancies();
    // vice president, treasurer, secretary, board members
    assert_eq!(gaps.len(), 4);
    assert!(gaps.iter().any(|g| g.contains("6 open Board Member")));
  }

  #[test]
  fn full_council_has_no_vacancies() {
    let term_id = Uuid::new_v4();
    let mut all = vec![
      assignment(term_id, PositionKind::President),
      assignment(term_id, PositionKind::VicePresident),
      assignment(term_id, PositionKind::Treasurer),
      assignment(term_id, PositionKind::Secretary),
    ];
    all.extend(
      (0..6).map(|_| assignment(term_id, PositionKind::BoardMember)),
    );

    let comp = Composition::from_active(term_id, all);
    assert!(comp.vacancies().is_empty());
    assert_eq!(comp.total_positions, 10);
  }
}
