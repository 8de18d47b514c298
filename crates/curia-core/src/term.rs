//! Council terms — bounded periods of governance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// A council term (e.g. "Council 2024-2026").
///
/// At most one term is active at any time across the whole system.
/// Activating a term clears every other term's flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
  pub term_id:     Uuid,
  pub name:        String,
  pub start_date:  DateTime<Utc>,
  pub end_date:    DateTime<Utc>,
  pub is_active:   bool,
  pub description: String,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::TermStore::insert_term`].
/// The id and audit timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTerm {
  pub name:        String,
  pub start_date:  DateTime<Utc>,
  pub end_date:    DateTime<Utc>,
  pub is_active:   bool,
  pub description: String,
}

impl NewTerm {
  /// A term must be named and must span a non-empty date range.
  pub fn validate(&self) -> Result<(), Error> {
    if self.name.trim().is_empty() {
      return Err(Error::InvalidTerm("name is required".into()));
    }
    if self.start_date >= self.end_date {
      return Err(Error::InvalidTerm(
        "start date must precede end date".into(),
      ));
    }
    Ok(())
  }
}

/// Partial update for a term. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TermPatch {
  pub name:        Option<String>,
  pub start_date:  Option<DateTime<Utc>>,
  pub end_date:    Option<DateTime<Utc>>,
  pub is_active:   Option<bool>,
  pub description: Option<String>,
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone as _, Utc};

  use super::NewTerm;

  fn term(name: &str, start_year: i32, end_year: i32) -> NewTerm {
    NewTerm {
      name:        name.into(),
      start_date:  Utc.with_ymd_and_hms(start_year, 1, 1, 0, 0, 0).unwrap(),
      end_date:    Utc.with_ymd_and_hms(end_year, 1, 1, 0, 0, 0).unwrap(),
      is_active:   false,
      description: String::new(),
    }
  }

  #[test]
  fn valid_term_passes() {
    assert!(term("Council 2024-2026", 2024, 2026).validate().is_ok());
  }

  #[test]
  fn blank_name_rejected() {
    assert!(term("   ", 2024, 2026).validate().is_err());
  }

  #[test]
  fn inverted_date_range_rejected() {
    assert!(term("Council", 2026, 2024).validate().is_err());
  }
}
