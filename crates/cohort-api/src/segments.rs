//! Handlers for `/segments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/segments` | Newest first |
//! | `POST`   | `/segments` | Body: [`CreateBody`]; returns 201 + segment |
//! | `GET`    | `/segments/:id` | 404 if not found |
//! | `PUT`    | `/segments/:id` | Body: [`UpdateBody`]; only supplied fields change |
//! | `DELETE` | `/segments/:id` | 204; 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use cohort_core::{
  segment::{NewSegment, Segment, SegmentPatch, SegmentType},
  store::{AssignmentStore, SegmentStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /segments`
pub async fn list<S, A>(
  State(engine): State<Engine<S, A>>,
) -> Result<Json<Vec<Segment>>, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  Ok(Json(engine.list_segments().await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:        String,
  #[serde(rename = "type")]
  pub kind:        SegmentType,
  pub config:      serde_json::Value,
  pub description: Option<String>,
  /// Defaults to `true`.
  pub is_active:   Option<bool>,
}

impl From<CreateBody> for NewSegment {
  fn from(b: CreateBody) -> Self {
    NewSegment {
      name:         b.name,
      segment_type: b.kind,
      config:       b.config,
      description:  b.description.unwrap_or_default(),
      is_active:    b.is_active.unwrap_or(true),
    }
  }
}

/// `POST /segments` — returns 201 + the stored [`Segment`].
pub async fn create<S, A>(
  State(engine): State<Engine<S, A>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  let segment = engine.create_segment(NewSegment::from(body)).await?;
  Ok((StatusCode::CREATED, Json(segment)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /segments/:id`
pub async fn get_one<S, A>(
  State(engine): State<Engine<S, A>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Segment>, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  Ok(Json(engine.get_segment(id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /segments/:id`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub name:        Option<String>,
  #[serde(rename = "type")]
  pub kind:        Option<SegmentType>,
  pub config:      Option<serde_json::Value>,
  pub description: Option<String>,
  pub is_active:   Option<bool>,
}

impl From<UpdateBody> for SegmentPatch {
  fn from(b: UpdateBody) -> Self {
    SegmentPatch {
      name:         b.name,
      segment_type: b.kind,
      config:       b.config,
      description:  b.description,
      is_active:    b.is_active,
    }
  }
}

/// `PUT /segments/:id` — returns the merged segment.
pub async fn update<S, A>(
  State(engine): State<Engine<S, A>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Segment>, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  if body.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  Ok(Json(engine.update_segment(id, SegmentPatch::from(body)).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /segments/:id`
pub async fn delete<S, A>(
  State(engine): State<Engine<S, A>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  engine.delete_segment(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
