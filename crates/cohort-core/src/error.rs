//! Error types for `cohort-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("segment not found: {0}")]
  SegmentNotFound(Uuid),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Raised by stores that reject, rather than overwrite, an existing
  /// `(segment_id, user_id)` pair.
  #[error("user {user_id} is already assigned to segment {segment_id}")]
  Conflict { segment_id: Uuid, user_id: Uuid },

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
