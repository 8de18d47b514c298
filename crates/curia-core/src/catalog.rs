//! The position catalog — the closed set of governance seats, their
//! capacity limits, and their display ordering.
//!
//! The catalog is immutable data over a closed enumeration; every function
//! here is total. Adding or removing a seat kind is a compile-time-checked
//! change at every consumption site.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::EnumIter;
use thiserror::Error;

/// A governance seat, or ordinary membership for [`NonCouncil`].
///
/// Variants are declared in priority order, so the derived [`Ord`] sorts the
/// way seats are displayed: President first, ordinary members last.
///
/// [`NonCouncil`]: PositionKind::NonCouncil
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum PositionKind {
  President,
  VicePresident,
  Treasurer,
  Secretary,
  BoardMember,
  NonCouncil,
}

impl PositionKind {
  /// Maximum simultaneously active assignments of this kind within one
  /// term. `None` means unlimited (ordinary membership).
  pub fn capacity(self) -> Option<u32> {
    match self {
      Self::President => Some(1),
      Self::VicePresident => Some(1),
      Self::Treasurer => Some(1),
      Self::Secretary => Some(1),
      Self::BoardMember => Some(6),
      Self::NonCouncil => None,
    }
  }

  /// Every kind except `NonCouncil` is an assignable council seat.
  pub fn is_council_seat(self) -> bool { !matches!(self, Self::NonCouncil) }

  /// President and Vice President only.
  pub fn is_leadership(self) -> bool {
    matches!(self, Self::President | Self::VicePresident)
  }

  /// Total display order, `1..=6`. Mirrors the declaration order.
  pub fn priority(self) -> u8 {
    match self {
      Self::President => 1,
      Self::VicePresident => 2,
      Self::Treasurer => 3,
      Self::Secretary => 4,
      Self::BoardMember => 5,
      Self::NonCouncil => 6,
    }
  }

  /// The five council seats, in priority order.
  pub fn council_seats() -> impl Iterator<Item = Self> {
    use strum::IntoEnumIterator as _;
    Self::iter().filter(|kind| kind.is_council_seat())
  }

  /// The discriminant string stored in the `position` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::President => "president",
      Self::VicePresident => "vice_president",
      Self::Treasurer => "treasurer",
      Self::Secretary => "secretary",
      Self::BoardMember => "board_member",
      Self::NonCouncil => "non_council",
    }
  }
}

impl fmt::Display for PositionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::President => "President",
      Self::VicePresident => "Vice President",
      Self::Treasurer => "Board Treasurer",
      Self::Secretary => "Board Secretary",
      Self::BoardMember => "Board Member",
      Self::NonCouncil => "Non-Council Member",
    })
  }
}

/// Returned by [`PositionKind::from_str`] for a string outside the catalog.
#[derive(Debug, Clone, Error)]
#[error("unknown position kind: {0:?}")]
pub struct UnknownPositionKind(pub String);

impl FromStr for PositionKind {
  type Err = UnknownPositionKind;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "president" => Ok(Self::President),
      "vice_president" => Ok(Self::VicePresident),
      "treasurer" => Ok(Self::Treasurer),
      "secretary" => Ok(Self::Secretary),
      "board_member" => Ok(Self::BoardMember),
      "non_council" => Ok(Self::NonCouncil),
      other => Err(UnknownPositionKind(other.to_owned())),
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::PositionKind;

  #[test]
  fn capacities() {
    assert_eq!(PositionKind::President.capacity(), Some(1));
    assert_eq!(PositionKind::VicePresident.capacity(), Some(1));
    assert_eq!(PositionKind::Treasurer.capacity(), Some(1));
    assert_eq!(PositionKind::Secretary.capacity(), Some(1));
    assert_eq!(PositionKind::BoardMember.capacity(), Some(6));
    assert_eq!(PositionKind::NonCouncil.capacity(), None);
  }

  #[test]
  fn council_seats_excludes_ordinary_membership() {
    let seats: Vec<_> = PositionKind::council_seats().collect();
    assert_eq!(seats.len(), 5);
    assert!(!seats.contains(&PositionKind::NonCouncil));
  }

  #[test]
  fn leadership_is_president_and_vice_president_only() {
    let leaders: Vec<_> =
      PositionKind::iter().filter(|k| k.is_leadership()).collect();
    assert_eq!(
      leaders,
      vec![PositionKind::President, PositionKind::VicePresident]
    );
  }

  #[test]
  fn priority_matches_declaration_order() {
    let mut kinds: Vec<_> = PositionKind::iter().collect();
    kinds.sort();
    let priorities: Vec<_> = kinds.iter().map(|k| k.priority()).collect();
    assert_eq!(priorities, vec![1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn discriminants_round_trip() {
    for kind in PositionKind::iter() {
      assert_eq!(kind.as_str().parse::<PositionKind>().unwrap(), kind);
    }
    assert!("chancellor".parse::<PositionKind>().is_err());
  }
}
