//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed nanosecond
//! width, so lexical order is chronological order. UUIDs are stored as
//! hyphenated lowercase strings. Segment config is stored as compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use cohort_core::{
  assignment::{Assignment, AssignmentType},
  segment::{Segment, SegmentType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_segment_type(s: &str) -> Result<SegmentType> {
  SegmentType::parse(s).ok_or_else(|| Error::UnknownEnum {
    column: "segments.type",
    value:  s.to_owned(),
  })
}

pub fn decode_assignment_type(s: &str) -> Result<AssignmentType> {
  AssignmentType::parse(s).ok_or_else(|| Error::UnknownEnum {
    column: "user_segment_assignment.assignment_type",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `segments` read, in [`RawSegment`] order.
pub const SEGMENT_COLUMNS: &str =
  "id, segment_name, type, config, description, is_active, created_on";

/// Raw values read directly from a `segments` row.
pub struct RawSegment {
  pub id:          String,
  pub name:        String,
  pub kind:        String,
  pub config:      String,
  pub description: String,
  pub is_active:   bool,
  pub created_on:  String,
}

impl RawSegment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      kind:        row.get(2)?,
      config:      row.get(3)?,
      description: row.get(4)?,
      is_active:   row.get(5)?,
      created_on:  row.get(6)?,
    })
  }

  pub fn into_segment(self) -> Result<Segment> {
    Ok(Segment {
      id:           decode_uuid(&self.id)?,
      name:         self.name,
      segment_type: decode_segment_type(&self.kind)?,
      config:       serde_json::from_str(&self.config)?,
      description:  self.description,
      is_active:    self.is_active,
      created_on:   decode_dt(&self.created_on)?,
    })
  }
}

/// Column list shared by every assignment read, in [`RawAssignment`] order.
pub const ASSIGNMENT_COLUMNS: &str =
  "segment_id, user_id, assignment_type, assigned_at";

/// Raw strings read directly from a `user_segment_assignment` row.
pub struct RawAssignment {
  pub segment_id:      String,
  pub user_id:         String,
  pub assignment_type: String,
  pub assigned_at:     String,
}

impl RawAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      segment_id:      row.get(0)?,
      user_id:         row.get(1)?,
      assignment_type: row.get(2)?,
      assigned_at:     row.get(3)?,
    })
  }

  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      segment_id:      decode_uuid(&self.segment_id)?,
      user_id:         decode_uuid(&self.user_id)?,
      assignment_type: decode_assignment_type(&self.assignment_type)?,
      assigned_at:     decode_dt(&self.assigned_at)?,
    })
  }
}
