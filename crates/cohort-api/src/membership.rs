//! Handlers for user ↔ segment membership.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/segments/:id/users` | Body: `{"user_id":"..."}`; 204 |
//! | `DELETE` | `/segments/:id/users/:user_id` | 204 even if not a member |
//! | `GET`    | `/segments/:id/users` | [`SegmentUsers`] |
//! | `GET`    | `/users/:user_id/segments` | [`UserSegments`] |
//! | `POST`   | `/segments/mass-assign` | Body: [`MassAssignBody`]; returns [`MassAssignResult`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use cohort_core::{
  assignment::MassAssignResult,
  engine::PERCENT_RANGE,
  segment::Segment,
  store::{AssignmentStore, SegmentStore},
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Engine, error::ApiError};

// ─── Assign / unassign ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub user_id: Uuid,
}

/// `POST /segments/:id/users`
pub async fn assign<S, A>(
  State(engine): State<Engine<S, A>>,
  Path(segment_id): Path<Uuid>,
  Json(body): Json<AssignBody>,
) -> Result<StatusCode, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  engine.assign_user(segment_id, body.user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /segments/:id/users/:user_id`
pub async fn unassign<S, A>(
  State(engine): State<Engine<S, A>>,
  Path((segment_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  engine.unassign_user(segment_id, user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Listings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentUsers {
  pub segment_id: Uuid,
  pub user_ids:   Vec<Uuid>,
}

/// `GET /segments/:id/users`
pub async fn segment_users<S, A>(
  State(engine): State<Engine<S, A>>,
  Path(segment_id): Path<Uuid>,
) -> Result<Json<SegmentUsers>, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  let user_ids = engine.list_segment_users(segment_id).await?;
  Ok(Json(SegmentUsers { segment_id, user_ids }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSegments {
  pub user_id:  Uuid,
  pub segments: Vec<Segment>,
}

/// `GET /users/:user_id/segments`
pub async fn user_segments<S, A>(
  State(engine): State<Engine<S, A>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<UserSegments>, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  let segments = engine.list_user_segments(user_id).await?;
  Ok(Json(UserSegments { user_id, segments }))
}

// ─── Mass assignment ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MassAssignBody {
  #[serde(rename = "segmentID", alias = "segment_id")]
  pub segment_id: Uuid,
  /// Must lie in `1..=100`. Accepted as a wide integer so that out-of-range
  /// values get a 400 rather than a deserialisation failure.
  pub percent:    i64,
}

/// `POST /segments/mass-assign`
pub async fn mass_assign<S, A>(
  State(engine): State<Engine<S, A>>,
  Json(body): Json<MassAssignBody>,
) -> Result<Json<MassAssignResult>, ApiError>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  let percent = u8::try_from(body.percent)
    .ok()
    .filter(|p| PERCENT_RANGE.contains(p))
    .ok_or_else(|| ApiError::BadRequest("percent must be between 1 and 100".into()))?;

  let mut rng = StdRng::from_entropy();
  let result = engine
    .mass_assign_segment(body.segment_id, percent, &mut rng)
    .await?;
  Ok(Json(result))
}
