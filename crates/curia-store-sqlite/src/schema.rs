//! SQL schema for the curia SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS terms (
    term_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    start_date  TEXT NOT NULL,   -- ISO 8601 UTC
    end_date    TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- At most one term is active across the whole system.
CREATE UNIQUE INDEX IF NOT EXISTS terms_one_active_idx
    ON terms(is_active) WHERE is_active = 1;

CREATE TABLE IF NOT EXISTS members (
    member_id             TEXT PRIMARY KEY,
    full_name             TEXT NOT NULL,
    email                 TEXT NOT NULL,
    status                TEXT NOT NULL DEFAULT 'active',
    -- cached council projection; assignments remain authoritative
    position              TEXT NOT NULL DEFAULT 'non_council',
    is_council_member     INTEGER NOT NULL DEFAULT 0,
    current_assignment_id TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

-- Assignment records are historical: rows are deactivated, never deleted.
-- member_id carries no foreign key; a directory row may be purged while
-- the assignment history is retained.
CREATE TABLE IF NOT EXISTS assignments (
    assignment_id TEXT PRIMARY KEY,
    member_id     TEXT NOT NULL,
    term_id       TEXT NOT NULL,
    position      TEXT NOT NULL,   -- discriminant of PositionKind
    start_date    TEXT NOT NULL,
    end_date      TEXT,            -- NULL while the tenure is open-ended
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- A member holds at most one active seat per term.
CREATE UNIQUE INDEX IF NOT EXISTS assignments_one_active_seat_idx
    ON assignments(term_id, member_id) WHERE is_active = 1;

CREATE INDEX IF NOT EXISTS assignments_term_idx   ON assignments(term_id);
CREATE INDEX IF NOT EXISTS assignments_member_idx ON assignments(member_id);

-- Capacity backstop: a write that would push an active council seat past
-- its capacity is rejected even when the writer's pre-check raced a
-- concurrent assignment. Capacities must match the position catalog.
CREATE TRIGGER IF NOT EXISTS assignments_capacity_insert
BEFORE INSERT ON assignments
WHEN NEW.is_active = 1 AND NEW.position != 'non_council'
BEGIN
    SELECT RAISE(ABORT, 'seat capacity exceeded')
    WHERE (SELECT COUNT(*) FROM assignments
           WHERE term_id = NEW.term_id
             AND position = NEW.position
             AND is_active = 1)
          >= CASE NEW.position
               WHEN 'president'      THEN 1
               WHEN 'vice_president' THEN 1
               WHEN 'treasurer'      THEN 1
               WHEN 'secretary'      THEN 1
               WHEN 'board_member'   THEN 6
             END;
END;

CREATE TRIGGER IF NOT EXISTS assignments_capacity_update
BEFORE UPDATE OF position, is_active ON assignments
WHEN NEW.is_active = 1 AND NEW.position != 'non_council'
     AND (OLD.position != NEW.position OR OLD.is_active = 0)
BEGIN
    SELECT RAISE(ABORT, 'seat capacity exceeded')
    WHERE (SELECT COUNT(*) FROM assignments
           WHERE term_id = NEW.term_id
             AND position = NEW.position
             AND is_active = 1
             AND assignment_id != NEW.assignment_id)
          >= CASE NEW.position
               WHEN 'president'      THEN 1
               WHEN 'vice_president' THEN 1
               WHEN 'treasurer'      THEN 1
               WHEN 'secretary'      THEN 1
               WHEN 'board_member'   THEN 6
             END;
END;

PRAGMA user_version = 1;
";
