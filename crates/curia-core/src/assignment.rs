//! Seat assignments — the record linking one member to one seat for one
//! term.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::PositionKind;

/// One member's tenure in one seat during one term.
///
/// Assignments are historical records: created active, deactivated on
/// removal, never deleted and never reactivated. A fresh appointment always
/// creates a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
  pub assignment_id: Uuid,
  pub member_id:     Uuid,
  pub term_id:       Uuid,
  pub kind:          PositionKind,
  pub start_date:    DateTime<Utc>,
  /// `None` while the tenure is open-ended; set to the removal time when
  /// the seat is vacated.
  pub end_date:      Option<DateTime<Utc>>,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Assignment {
  /// Whether the tenure is in effect right now: the record is active and
  /// the current time falls within `[start_date, end_date)`.
  pub fn is_current(&self) -> bool { self.is_current_at(Utc::now()) }

  pub fn is_current_at(&self, now: DateTime<Utc>) -> bool {
    self.is_active
      && now >= self.start_date
      && self.end_date.is_none_or(|end| now < end)
  }
}

/// Input to [`crate::store::PositionStore::insert_assignment`].
/// The store assigns the id and audit timestamps; new assignments are
/// always active with an unset end date.
#[derive(Debug, Clone)]
pub struct NewAssignment {
  pub member_id:  Uuid,
  pub term_id:    Uuid,
  pub kind:       PositionKind,
  pub start_date: DateTime<Utc>,
}

/// Partial update for an assignment's mutable fields. Activation state is
/// not patchable; it changes only through removal.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPatch {
  pub kind:       Option<PositionKind>,
  pub start_date: Option<DateTime<Utc>>,
  pub end_date:   Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use uuid::Uuid;

  use super::Assignment;
  use crate::catalog::PositionKind;

  fn assignment() -> Assignment {
    let now = Utc::now();
    Assignment {
      assignment_id: Uuid::new_v4(),
      member_id:     Uuid::new_v4(),
      term_id:       Uuid::new_v4(),
      kind:          PositionKind::President,
      start_date:    now - Duration::days(30),
      end_date:      None,
      is_active:     true,
      created_at:    now,
      updated_at:    now,
    }
  }

  #[test]
  fn open_ended_active_assignment_is_current() {
    assert!(assignment().is_current());
  }

  #[test]
  fn inactive_assignment_is_not_current() {
    let mut a = assignment();
    a.is_active = false;
    assert!(!a.is_current());
  }

  #[test]
  fn ended_assignment_is_not_current() {
    let mut a = assignment();
    a.end_date = Some(Utc::now() - Duration::days(1));
    assert!(!a.is_current());
  }

  #[test]
  fn future_assignment_is_not_current() {
    let mut a = assignment();
    a.start_date = Utc::now() + Duration::days(1);
    assert!(!a.is_current());
  }

  #[test]
  fn end_date_is_exclusive() {
    let now = Utc::now();
    let mut a = assignment();
    a.end_date = Some(now);
    assert!(!a.is_current_at(now));
    assert!(a.is_current_at(now - Duration::seconds(1)));
  }
}
