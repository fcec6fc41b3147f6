//! The `SegmentStore` and `AssignmentStore` traits.
//!
//! These are implemented by storage backends (e.g. `cohort-store-sqlite`).
//! They carry no business rules: existence checks, stamping, and sampling
//! all live in [`crate::engine::SegmentationEngine`].
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). Backend errors must
//! convert into [`crate::Error`] so the engine can tell a missing segment or
//! an assignment conflict apart from a generic storage failure.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  assignment::Assignment,
  segment::{NewSegment, Segment},
};

// ─── Segments ────────────────────────────────────────────────────────────────

/// Persistent catalogue of segment definitions.
pub trait SegmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// Persist a new segment, generating its id.
  fn create_segment(
    &self,
    draft: NewSegment,
    created_on: DateTime<Utc>,
  ) -> impl Future<Output = Result<Segment, Self::Error>> + Send + '_;

  /// Retrieve a segment by id. Returns `None` if not found.
  fn get_segment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Segment>, Self::Error>> + Send + '_;

  /// All segments, newest first.
  fn list_segments(
    &self,
  ) -> impl Future<Output = Result<Vec<Segment>, Self::Error>> + Send + '_;

  /// Overwrite every mutable field of an existing segment. `created_on` is
  /// left untouched. Errors if the segment does not exist.
  fn update_segment(
    &self,
    segment: Segment,
  ) -> impl Future<Output = Result<Segment, Self::Error>> + Send + '_;

  /// Delete a segment. Errors if the segment does not exist.
  fn delete_segment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Assignments ─────────────────────────────────────────────────────────────

/// Persistent segment × user relation keyed by `(segment_id, user_id)`.
pub trait AssignmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// Insert the assignment, or overwrite `assignment_type` and `assigned_at`
  /// of the existing row for the same pair. Must be atomic with respect to
  /// concurrent calls for the same pair.
  fn add_assignment(
    &self,
    assignment: Assignment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove the row for the pair if present. Absent rows are not an error.
  fn remove_assignment(
    &self,
    segment_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_by_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  fn list_by_segment(
    &self,
    segment_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  /// Every distinct user id that appears in any assignment, sorted ascending.
  /// This is the only notion of "known users" in the system.
  fn all_user_ids(
    &self,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}
