//! [`SqliteStore`] — the SQLite implementation of [`SegmentStore`] and
//! [`AssignmentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use cohort_core::{
  assignment::Assignment,
  segment::{NewSegment, Segment},
  store::{AssignmentStore, SegmentStore},
};
use rusqlite::{ErrorCode, OptionalExtension as _, ffi};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ASSIGNMENT_COLUMNS, RawAssignment, RawSegment, SEGMENT_COLUMNS, decode_uuid,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A segment catalogue and assignment relation backed by a single SQLite
/// file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_assignments(
    &self,
    filter_column: &'static str,
    id: Uuid,
  ) -> Result<Vec<Assignment>> {
    let id_str = encode_uuid(id);

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ASSIGNMENT_COLUMNS} FROM user_segment_assignment
           WHERE {filter_column} = ?1
           ORDER BY assigned_at, segment_id, user_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawAssignment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssignment::into_assignment).collect()
  }
}

/// True if `e` is SQLite refusing a write on a uniqueness/primary-key
/// constraint. Other constraint failures (NOT NULL, CHECK, triggers) are
/// storage errors.
fn is_duplicate_key(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == ErrorCode::ConstraintViolation
        && matches!(
          f.extended_code,
          ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
        )
  )
}

// ─── SegmentStore impl ───────────────────────────────────────────────────────

impl SegmentStore for SqliteStore {
  type Error = Error;

  async fn create_segment(
    &self,
    draft: NewSegment,
    created_on: DateTime<Utc>,
  ) -> Result<Segment> {
    let segment = draft.into_segment(Uuid::new_v4(), created_on);

    let id_str      = encode_uuid(segment.id);
    let name        = segment.name.clone();
    let kind_str    = segment.segment_type.as_str();
    let config_str  = serde_json::to_string(&segment.config)?;
    let description = segment.description.clone();
    let is_active   = segment.is_active;
    let created_str = encode_dt(segment.created_on);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO segments
             (id, segment_name, type, config, description, is_active, created_on)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            name,
            kind_str,
            config_str,
            description,
            is_active,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(segment)
  }

  async fn get_segment(&self, id: Uuid) -> Result<Option<Segment>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSegment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SEGMENT_COLUMNS} FROM segments WHERE id = ?1"),
              rusqlite::params![id_str],
              RawSegment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSegment::into_segment).transpose()
  }

  async fn list_segments(&self) -> Result<Vec<Segment>> {
    let raws: Vec<RawSegment> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SEGMENT_COLUMNS} FROM segments ORDER BY created_on DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawSegment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSegment::into_segment).collect()
  }

  async fn update_segment(&self, segment: Segment) -> Result<Segment> {
    let id          = segment.id;
    let id_str      = encode_uuid(id);
    let kind_str    = segment.segment_type.as_str();
    let config_str  = serde_json::to_string(&segment.config)?;
    let Segment { name, description, is_active, .. } = segment;

    // RETURNING re-reads the row so `created_on` comes from storage, not from
    // the caller.
    let raw: Option<RawSegment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE segments
                    SET segment_name = ?2,
                        type         = ?3,
                        config       = ?4,
                        description  = ?5,
                        is_active    = ?6
                  WHERE id = ?1
                 RETURNING {SEGMENT_COLUMNS}"
              ),
              rusqlite::params![id_str, name, kind_str, config_str, description, is_active],
              RawSegment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.ok_or(Error::SegmentNotFound(id))?.into_segment()
  }

  async fn delete_segment(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM segments WHERE id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::SegmentNotFound(id));
    }
    Ok(())
  }
}

// ─── AssignmentStore impl ────────────────────────────────────────────────────

impl AssignmentStore for SqliteStore {
  type Error = Error;

  async fn add_assignment(&self, assignment: Assignment) -> Result<()> {
    let Assignment { segment_id, user_id, assignment_type, assigned_at } = assignment;
    let segment_str = encode_uuid(segment_id);
    let user_str    = encode_uuid(user_id);
    let type_str    = assignment_type.as_str();
    let at_str      = encode_dt(assigned_at);

    // A single statement, so concurrent upserts of the same pair are
    // serialised by SQLite and can neither duplicate nor lose a row.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_segment_assignment
             (segment_id, user_id, assignment_type, assigned_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (segment_id, user_id) DO UPDATE
              SET assignment_type = excluded.assignment_type,
                  assigned_at     = excluded.assigned_at",
          rusqlite::params![segment_str, user_str, type_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| {
        if is_duplicate_key(&e) {
          Error::Conflict { segment_id, user_id }
        } else {
          Error::Database(e)
        }
      })?;

    debug!(%segment_id, %user_id, "upserted assignment");
    Ok(())
  }

  async fn remove_assignment(&self, segment_id: Uuid, user_id: Uuid) -> Result<()> {
    let segment_str = encode_uuid(segment_id);
    let user_str    = encode_uuid(user_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM user_segment_assignment WHERE segment_id = ?1 AND user_id = ?2",
          rusqlite::params![segment_str, user_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Assignment>> {
    self.query_assignments("user_id", user_id).await
  }

  async fn list_by_segment(&self, segment_id: Uuid) -> Result<Vec<Assignment>> {
    self.query_assignments("segment_id", segment_id).await
  }

  async fn all_user_ids(&self) -> Result<Vec<Uuid>> {
    let raws: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT user_id FROM user_segment_assignment ORDER BY user_id",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }
}
