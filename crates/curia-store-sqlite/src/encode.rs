//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Position kinds and member
//! statuses are stored as their snake_case discriminants. UUIDs are stored
//! as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use curia_core::{
  assignment::Assignment,
  catalog::PositionKind,
  member::{Member, MemberStatus, PositionCache},
  term::Term,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── PositionKind ────────────────────────────────────────────────────────────

pub fn encode_kind(kind: PositionKind) -> &'static str { kind.as_str() }

pub fn decode_kind(s: &str) -> Result<PositionKind> {
  s.parse().map_err(|e| Error::Decode(format!("{e}")))
}

// ─── MemberStatus ────────────────────────────────────────────────────────────

pub fn encode_member_status(status: MemberStatus) -> &'static str {
  match status {
    MemberStatus::Active => "active",
    MemberStatus::Suspended => "suspended",
    MemberStatus::Expired => "expired",
  }
}

pub fn decode_member_status(s: &str) -> Result<MemberStatus> {
  match s {
    "active" => Ok(MemberStatus::Active),
    "suspended" => Ok(MemberStatus::Suspended),
    "expired" => Ok(MemberStatus::Expired),
    other => Err(Error::Decode(format!("unknown member status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `terms` row.
pub struct RawTerm {
  pub term_id:     String,
  pub name:        String,
  pub start_date:  String,
  pub end_date:    String,
  pub is_active:   bool,
  pub description: String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawTerm {
  pub fn into_term(self) -> Result<Term> {
    Ok(Term {
      term_id:     decode_uuid(&self.term_id)?,
      name:        self.name,
      start_date:  decode_dt(&self.start_date)?,
      end_date:    decode_dt(&self.end_date)?,
      is_active:   self.is_active,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `assignments` row.
pub struct RawAssignment {
  pub assignment_id: String,
  pub member_id:     String,
  pub term_id:       String,
  pub position:      String,
  pub start_date:    String,
  pub end_date:      Option<String>,
  pub is_active:     bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawAssignment {
  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      assignment_id: decode_uuid(&self.assignment_id)?,
      member_id:     decode_uuid(&self.member_id)?,
      term_id:       decode_uuid(&self.term_id)?,
      kind:          decode_kind(&self.position)?,
      start_date:    decode_dt(&self.start_date)?,
      end_date:      self.end_date.as_deref().map(decode_dt).transpose()?,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `members` row.
pub struct RawMember {
  pub member_id:             String,
  pub full_name:             String,
  pub email:                 String,
  pub status:                String,
  pub position:              String,
  pub is_council_member:     bool,
  pub current_assignment_id: Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
}

impl RawMember {
  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      member_id:  decode_uuid(&self.member_id)?,
      full_name:  self.full_name,
      email:      self.email,
      status:     decode_member_status(&self.status)?,
      council:    PositionCache {
        kind:                  decode_kind(&self.position)?,
        is_council_member:     self.is_council_member,
        current_assignment_id: self
          .current_assignment_id
          .as_deref()
          .map(decode_uuid)
          .transpose()?,
      },
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
