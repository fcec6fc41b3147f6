//! Assignment types — the many-to-many relation between segments and users.
//!
//! There is no user registry. The set of known users is whatever distinct
//! `user_id` values appear in the assignment relation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provenance of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentType {
  /// Explicit single assignment or mass-assignment.
  #[default]
  Manual,
  /// Reserved for non-manual assignment paths.
  Auto,
}

impl AssignmentType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Manual => "manual",
      Self::Auto => "auto",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "manual" => Some(Self::Manual),
      "auto" => Some(Self::Auto),
      _ => None,
    }
  }
}

/// "User `user_id` belongs to segment `segment_id`."
///
/// At most one assignment exists per `(segment_id, user_id)` pair;
/// re-assigning overwrites `assignment_type` and `assigned_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
  pub segment_id:      Uuid,
  pub user_id:         Uuid,
  pub assignment_type: AssignmentType,
  /// Time of the most recent (re)assignment.
  pub assigned_at:     DateTime<Utc>,
}

impl Assignment {
  pub fn manual(segment_id: Uuid, user_id: Uuid, assigned_at: DateTime<Utc>) -> Self {
    Self {
      segment_id,
      user_id,
      assignment_type: AssignmentType::Manual,
      assigned_at,
    }
  }
}

/// Summary of a mass-assignment run. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MassAssignResult {
  /// Size of the known-user population at call time.
  pub total_users: usize,
  pub assigned:    usize,
  /// Users the store refused with an explicit conflict.
  pub skipped:     usize,
}
