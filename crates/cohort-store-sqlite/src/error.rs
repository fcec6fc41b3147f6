//! Error type for `cohort-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownEnum { column: &'static str, value: String },

  #[error("segment not found: {0}")]
  SegmentNotFound(Uuid),

  /// A uniqueness constraint rejected an assignment write.
  #[error("user {user_id} is already assigned to segment {segment_id}")]
  Conflict { segment_id: Uuid, user_id: Uuid },
}

impl From<Error> for cohort_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::SegmentNotFound(id) => Self::SegmentNotFound(id),
      Error::Conflict { segment_id, user_id } => Self::Conflict { segment_id, user_id },
      other => Self::Storage(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
