//! JSON REST API for Cohort.
//!
//! Exposes an axum [`Router`] backed by a [`SegmentationEngine`] over any
//! pair of [`SegmentStore`] / [`AssignmentStore`] backends. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(cohort_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod membership;
pub mod segments;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use cohort_core::{
  SegmentationEngine,
  store::{AssignmentStore, SegmentStore},
};

pub use error::ApiError;

/// Shared handler state.
pub type Engine<S, A> = Arc<SegmentationEngine<S, A>>;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested or merged into any parent router
/// regardless of its own state type.
pub fn api_router<S, A>(engine: Engine<S, A>) -> Router<()>
where
  S: SegmentStore + 'static,
  A: AssignmentStore + 'static,
{
  Router::new()
    // Segments
    .route("/segments", get(segments::list::<S, A>).post(segments::create::<S, A>))
    .route(
      "/segments/{id}",
      get(segments::get_one::<S, A>)
        .put(segments::update::<S, A>)
        .delete(segments::delete::<S, A>),
    )
    // Membership
    .route("/segments/mass-assign", post(membership::mass_assign::<S, A>))
    .route(
      "/segments/{id}/users",
      get(membership::segment_users::<S, A>).post(membership::assign::<S, A>),
    )
    .route("/segments/{id}/users/{user_id}", delete(membership::unassign::<S, A>))
    .route("/users/{user_id}/segments", get(membership::user_segments::<S, A>))
    .with_state(engine)
}
