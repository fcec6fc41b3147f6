//! SQL schema for the Cohort SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS segments (
    id           TEXT PRIMARY KEY,
    segment_name TEXT NOT NULL,
    type         TEXT NOT NULL,    -- 'static' | 'dynamic' | 'dynamic_rule'
    config       TEXT NOT NULL,    -- opaque JSON payload
    description  TEXT NOT NULL DEFAULT '',
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_on   TEXT NOT NULL     -- RFC 3339 UTC, fixed nanosecond width
);

-- One row per (segment, user) pair. No foreign key to segments: deleting a
-- segment leaves its assignments behind and readers skip them.
CREATE TABLE IF NOT EXISTS user_segment_assignment (
    segment_id      TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    assignment_type TEXT NOT NULL DEFAULT 'manual',  -- 'manual' | 'auto'
    assigned_at     TEXT NOT NULL,
    PRIMARY KEY (segment_id, user_id)
);

CREATE INDEX IF NOT EXISTS segments_created_idx   ON segments(created_on);
CREATE INDEX IF NOT EXISTS assignment_user_idx    ON user_segment_assignment(user_id);

PRAGMA user_version = 1;
";
