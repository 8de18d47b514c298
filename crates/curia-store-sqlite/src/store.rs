//! [`SqliteStore`] — the SQLite implementation of the curia store traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use curia_core::{
  assignment::{Assignment, AssignmentPatch, NewAssignment},
  catalog::PositionKind,
  member::{Member, NewMember, PositionCache},
  store::{Conflict, MemberDirectory, PositionStore, StoreError, TermStore},
  term::{NewTerm, Term, TermPatch},
};

use crate::{
  Error,
  encode::{
    RawAssignment, RawMember, RawTerm, encode_dt, encode_kind,
    encode_member_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Constraint decoding ─────────────────────────────────────────────────────

/// The abort message raised by the capacity triggers in `schema.rs`.
const CAPACITY_ABORT: &str = "seat capacity exceeded";

fn constraint_message(e: &tokio_rusqlite::Error) -> Option<&str> {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
    ffi,
    Some(msg),
  )) = e
    && ffi.code == rusqlite::ErrorCode::ConstraintViolation
  {
    return Some(msg.as_str());
  }
  None
}

fn db_unavailable(e: tokio_rusqlite::Error) -> StoreError {
  StoreError::unavailable(Error::Database(e))
}

/// Decode a failed assignment write into the conflict it violated.
fn assignment_write_error(
  e: tokio_rusqlite::Error,
  kind: PositionKind,
) -> StoreError {
  match constraint_message(&e) {
    Some(msg) if msg.contains(CAPACITY_ABORT) => {
      Conflict::SeatCapacity { kind }.into()
    }
    Some(msg) if msg.contains("assignments") => {
      Conflict::DuplicateActiveAssignment.into()
    }
    _ => db_unavailable(e),
  }
}

/// Decode a failed term write into the conflict it violated.
fn term_write_error(e: tokio_rusqlite::Error) -> StoreError {
  match constraint_message(&e) {
    Some(msg) if msg.contains("terms") => Conflict::ActiveTermExists.into(),
    _ => db_unavailable(e),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A curia council store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. One
/// `SqliteStore` serves as all three collaborators (terms, positions,
/// members).
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> crate::Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_term(&self, id: Uuid) -> Result<Option<Term>, StoreError> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTerm> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT term_id, name, start_date, end_date, is_active,
                      description, created_at, updated_at
               FROM terms WHERE term_id = ?1",
              rusqlite::params![id_str],
              term_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_unavailable)?;

    raw
      .map(RawTerm::into_term)
      .transpose()
      .map_err(StoreError::from)
  }

  async fn fetch_assignment(
    &self,
    id: Uuid,
  ) -> Result<Option<Assignment>, StoreError> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAssignment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT assignment_id, member_id, term_id, position,
                      start_date, end_date, is_active, created_at, updated_at
               FROM assignments WHERE assignment_id = ?1",
              rusqlite::params![id_str],
              assignment_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_unavailable)?;

    raw
      .map(RawAssignment::into_assignment)
      .transpose()
      .map_err(StoreError::from)
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn term_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTerm> {
  Ok(RawTerm {
    term_id:     row.get(0)?,
    name:        row.get(1)?,
    start_date:  row.get(2)?,
    end_date:    row.get(3)?,
    is_active:   row.get(4)?,
    description: row.get(5)?,
    created_at:  row.get(6)?,
    updated_at:  row.get(7)?,
  })
}

fn assignment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAssignment> {
  Ok(RawAssignment {
    assignment_id: row.get(0)?,
    member_id:     row.get(1)?,
    term_id:       row.get(2)?,
    position:      row.get(3)?,
    start_date:    row.get(4)?,
    end_date:      row.get(5)?,
    is_active:     row.get(6)?,
    created_at:    row.get(7)?,
    updated_at:    row.get(8)?,
  })
}

fn member_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMember> {
  Ok(RawMember {
    member_id:             row.get(0)?,
    full_name:             row.get(1)?,
    email:                 row.get(2)?,
    status:                row.get(3)?,
    position:              row.get(4)?,
    is_council_member:     row.get(5)?,
    current_assignment_id: row.get(6)?,
    created_at:            row.get(7)?,
    updated_at:            row.get(8)?,
  })
}

// ─── TermStore impl ──────────────────────────────────────────────────────────

impl TermStore for SqliteStore {
  async fn insert_term(&self, input: NewTerm) -> Result<Term, StoreError> {
    let now = Utc::now();
    let term = Term {
      term_id:     Uuid::new_v4(),
      name:        input.name,
      start_date:  input.start_date,
      end_date:    input.end_date,
      is_active:   input.is_active,
      description: input.description,
      created_at:  now,
      updated_at:  now,
    };

    let id_str      = encode_uuid(term.term_id);
    let name        = term.name.clone();
    let start_str   = encode_dt(term.start_date);
    let end_str     = encode_dt(term.end_date);
    let is_active   = term.is_active;
    let description = term.description.clone();
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO terms (
             term_id, name, start_date, end_date, is_active,
             description, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            name,
            start_str,
            end_str,
            is_active,
            description,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(term_write_error)?;

    Ok(term)
  }

  async fn term(&self, id: Uuid) -> Result<Option<Term>, StoreError> {
    self.fetch_term(id).await
  }

  async fn active_term(&self) -> Result<Option<Term>, StoreError> {
    let raw: Option<RawTerm> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT term_id, name, start_date, end_date, is_active,
                      description, created_at, updated_at
               FROM terms WHERE is_active = 1",
              [],
              term_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_unavailable)?;

    raw
      .map(RawTerm::into_term)
      .transpose()
      .map_err(StoreError::from)
  }

  async fn list_terms(&self) -> Result<Vec<Term>, StoreError> {
    let raws: Vec<RawTerm> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT term_id, name, start_date, end_date, is_active,
                  description, created_at, updated_at
           FROM terms ORDER BY start_date DESC",
        )?;
        let rows = stmt
          .query_map([], term_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_unavailable)?;

    raws
      .into_iter()
      .map(RawTerm::into_term)
      .collect::<crate::Result<_>>()
      .map_err(StoreError::from)
  }

  async fn update_term(
    &self,
    id: Uuid,
    patch: TermPatch,
  ) -> Result<Option<Term>, StoreError> {
    let id_str      = encode_uuid(id);
    let name        = patch.name;
    let start_str   = patch.start_date.map(encode_dt);
    let end_str     = patch.end_date.map(encode_dt);
    let is_active   = patch.is_active;
    let description = patch.description;
    let at_str      = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE terms SET
             name        = COALESCE(?2, name),
             start_date  = COALESCE(?3, start_date),
             end_date    = COALESCE(?4, end_date),
             is_active   = COALESCE(?5, is_active),
             description = COALESCE(?6, description),
             updated_at  = ?7
           WHERE term_id = ?1",
          rusqlite::params![
            id_str,
            name,
            start_str,
            end_str,
            is_active,
            description,
            at_str,
          ],
        )?)
      })
      .await
      .map_err(term_write_error)?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_term(id).await
  }

  async fn set_term_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> Result<bool, StoreError> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE terms SET is_active = ?2, updated_at = ?3
           WHERE term_id = ?1",
          rusqlite::params![id_str, active, at_str],
        )?)
      })
      .await
      .map_err(term_write_error)?;

    Ok(changed > 0)
  }

  async fn deactivate_terms_except(
    &self,
    keep: Option<Uuid>,
  ) -> Result<u64, StoreError> {
    let keep_str = keep.map(encode_uuid);
    let at_str   = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE terms SET is_active = 0, updated_at = ?1
           WHERE is_active = 1 AND (?2 IS NULL OR term_id != ?2)",
          rusqlite::params![at_str, keep_str],
        )?)
      })
      .await
      .map_err(db_unavailable)?;

    Ok(changed as u64)
  }
}

// ─── PositionStore impl ──────────────────────────────────────────────────────

impl PositionStore for SqliteStore {
  async fn insert_assignment(
    &self,
    input: NewAssignment,
  ) -> Result<Assignment, StoreError> {
    let now = Utc::now();
    let assignment = Assignment {
      assignment_id: Uuid::new_v4(),
      member_id:     input.member_id,
      term_id:       input.term_id,
      kind:          input.kind,
      start_date:    input.start_date,
      end_date:      None,
      is_active:     true,
      created_at:    now,
      updated_at:    now,
    };

    let id_str     = encode_uuid(assignment.assignment_id);
    let member_str = encode_uuid(assignment.member_id);
    let term_str   = encode_uuid(assignment.term_id);
    let kind       = assignment.kind;
    let kind_str   = encode_kind(kind).to_owned();
    let start_str  = encode_dt(assignment.start_date);
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO assignments (
             assignment_id, member_id, term_id, position, start_date,
             end_date, is_active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, 1, ?6, ?7)",
          rusqlite::params![
            id_str,
            member_str,
            term_str,
            kind_str,
            start_str,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| assignment_write_error(e, kind))?;

    Ok(assignment)
  }

  async fn assignment(
    &self,
    id: Uuid,
  ) -> Result<Option<Assignment>, StoreError> {
    self.fetch_assignment(id).await
  }

  async fn count_active(
    &self,
    term_id: Uuid,
    kind: PositionKind,
  ) -> Result<u32, StoreError> {
    let term_str = encode_uuid(term_id);
    let kind_str = encode_kind(kind).to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM assignments
           WHERE term_id = ?1 AND position = ?2 AND is_active = 1",
          rusqlite::params![term_str, kind_str],
          |row| row.get(0),
        )?)
      })
      .await
      .map_err(db_unavailable)?;

    Ok(count as u32)
  }

  async fn active_for_member(
    &self,
    term_id: Uuid,
    member_id: Uuid,
  ) -> Result<Option<Assignment>, StoreError> {
    let term_str   = encode_uuid(term_id);
    let member_str = encode_uuid(member_id);

    let raw: Option<RawAssignment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT assignment_id, member_id, term_id, position,
                      start_date, end_date, is_active, created_at, updated_at
               FROM assignments
               WHERE term_id = ?1 AND member_id = ?2 AND is_active = 1",
              rusqlite::params![term_str, member_str],
              assignment_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_unavailable)?;

    raw
      .map(RawAssignment::into_assignment)
      .transpose()
      .map_err(StoreError::from)
  }

  async fn update_assignment(
    &self,
    id: Uuid,
    patch: AssignmentPatch,
  ) -> Result<Option<Assignment>, StoreError> {
    let id_str    = encode_uuid(id);
    let kind      = patch.kind;
    let kind_str  = kind.map(|k| encode_kind(k).to_owned());
    let start_str = patch.start_date.map(encode_dt);
    let end_str   = patch.end_date.map(encode_dt);
    let at_str    = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE assignments SET
             position   = COALESCE(?2, position),
             start_date = COALESCE(?3, start_date),
             end_date   = COALESCE(?4, end_date),
             updated_at = ?5
           WHERE assignment_id = ?1",
          rusqlite::params![id_str, kind_str, start_str, end_str, at_str],
        )?)
      })
      .await
      .map_err(|e| match kind {
        Some(k) => assignment_write_error(e, k),
        None => db_unavailable(e),
      })?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_assignment(id).await
  }

  async fn deactivate_assignment(
    &self,
    id: Uuid,
    end_date: DateTime<Utc>,
  ) -> Result<Option<Assignment>, StoreError> {
    let id_str  = encode_uuid(id);
    let end_str = encode_dt(end_date);
    let at_str  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE assignments SET is_active = 0, end_date = ?2, updated_at = ?3
           WHERE assignment_id = ?1",
          rusqlite::params![id_str, end_str, at_str],
        )?)
      })
      .await
      .map_err(db_unavailable)?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_assignment(id).await
  }

  async fn assignments_for_term(
    &self,
    term_id: Uuid,
    active_only: bool,
  ) -> Result<Vec<Assignment>, StoreError> {
    let term_str = encode_uuid(term_id);

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let rows = if active_only {
          let mut stmt = conn.prepare(
            "SELECT assignment_id, member_id, term_id, position,
                    start_date, end_date, is_active, created_at, updated_at
             FROM assignments
             WHERE term_id = ?1 AND is_active = 1
             ORDER BY created_at",
          )?;
          stmt
            .query_map(rusqlite::params![term_str], assignment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT assignment_id, member_id, term_id, position,
                    start_date, end_date, is_active, created_at, updated_at
             FROM assignments
             WHERE term_id = ?1
             ORDER BY created_at",
          )?;
          stmt
            .query_map(rusqlite::params![term_str], assignment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await
      .map_err(db_unavailable)?;

    raws
      .into_iter()
      .map(RawAssignment::into_assignment)
      .collect::<crate::Result<_>>()
      .map_err(StoreError::from)
  }

  async fn assignments_for_member(
    &self,
    member_id: Uuid,
  ) -> Result<Vec<Assignment>, StoreError> {
    let member_str = encode_uuid(member_id);

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT assignment_id, member_id, term_id, position,
                  start_date, end_date, is_active, created_at, updated_at
           FROM assignments
           WHERE member_id = ?1
           ORDER BY start_date DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![member_str], assignment_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_unavailable)?;

    raws
      .into_iter()
      .map(RawAssignment::into_assignment)
      .collect::<crate::Result<_>>()
      .map_err(StoreError::from)
  }
}

// ─── MemberDirectory impl ────────────────────────────────────────────────────

impl MemberDirectory for SqliteStore {
  async fn insert_member(
    &self,
    input: NewMember,
  ) -> Result<Member, StoreError> {
    let now = Utc::now();
    let member = Member {
      member_id:  Uuid::new_v4(),
      full_name:  input.full_name,
      email:      input.email,
      status:     input.status,
      council:    PositionCache::non_council(),
      created_at: now,
      updated_at: now,
    };

    let id_str     = encode_uuid(member.member_id);
    let full_name  = member.full_name.clone();
    let email      = member.email.clone();
    let status_str = encode_member_status(member.status).to_owned();
    let kind_str   = encode_kind(member.council.kind).to_owned();
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO members (
             member_id, full_name, email, status, position,
             is_council_member, current_assignment_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, ?7)",
          rusqlite::params![
            id_str,
            full_name,
            email,
            status_str,
            kind_str,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(db_unavailable)?;

    Ok(member)
  }

  async fn member(&self, id: Uuid) -> Result<Option<Member>, StoreError> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT member_id, full_name, email, status, position,
                      is_council_member, current_assignment_id,
                      created_at, updated_at
               FROM members WHERE member_id = ?1",
              rusqlite::params![id_str],
              member_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_unavailable)?;

    raw
      .map(RawMember::into_member)
      .transpose()
      .map_err(StoreError::from)
  }

  async fn list_members(&self) -> Result<Vec<Member>, StoreError> {
    let raws: Vec<RawMember> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT member_id, full_name, email, status, position,
                  is_council_member, current_assignment_id,
                  created_at, updated_at
           FROM members ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map([], member_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_unavailable)?;

    raws
      .into_iter()
      .map(RawMember::into_member)
      .collect::<crate::Result<_>>()
      .map_err(StoreError::from)
  }

  async fn set_position_cache(
    &self,
    member_id: Uuid,
    cache: PositionCache,
  ) -> Result<bool, StoreError> {
    let id_str         = encode_uuid(member_id);
    let kind_str       = encode_kind(cache.kind).to_owned();
    let is_council     = cache.is_council_member;
    let assignment_str = cache.current_assignment_id.map(encode_uuid);
    let at_str         = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE members SET
             position              = ?2,
             is_council_member     = ?3,
             current_assignment_id = ?4,
             updated_at            = ?5
           WHERE member_id = ?1",
          rusqlite::params![
            id_str,
            kind_str,
            is_council,
            assignment_str,
            at_str,
          ],
        )?)
      })
      .await
      .map_err(db_unavailable)?;

    Ok(changed > 0)
  }
}
