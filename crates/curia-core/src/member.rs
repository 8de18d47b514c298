//! Member directory records and the denormalised council cache.
//!
//! The directory is an external collaborator: the engine reads member
//! records and writes only the cached council projection. Assignment
//! records remain the source of truth for who holds which seat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::PositionKind;

/// Membership standing in the association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
  Active,
  Suspended,
  Expired,
}

/// The member's cached council standing — a read optimisation recomputed
/// from active assignments, never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCache {
  pub kind:                  PositionKind,
  pub is_council_member:     bool,
  pub current_assignment_id: Option<Uuid>,
}

impl PositionCache {
  /// The cache of a member holding no seat.
  pub fn non_council() -> Self {
    Self {
      kind:                  PositionKind::NonCouncil,
      is_council_member:     false,
      current_assignment_id: None,
    }
  }

  /// The cache of a member seated by `assignment_id`.
  pub fn seated(kind: PositionKind, assignment_id: Uuid) -> Self {
    Self {
      kind,
      is_council_member: true,
      current_assignment_id: Some(assignment_id),
    }
  }
}

impl Default for PositionCache {
  fn default() -> Self { Self::non_council() }
}

/// A member record as the council subsystem sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub member_id:  Uuid,
  pub full_name:  String,
  pub email:      String,
  pub status:     MemberStatus,
  pub council:    PositionCache,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::MemberDirectory::insert_member`].
/// New members start outside the council.
#[derive(Debug, Clone)]
pub struct NewMember {
  pub full_name: String,
  pub email:     String,
  pub status:    MemberStatus,
}
