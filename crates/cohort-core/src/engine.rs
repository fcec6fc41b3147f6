//! [`SegmentationEngine`] — segment lifecycle, user assignment, and
//! mass-assignment over a [`SegmentStore`] and an [`AssignmentStore`].
//!
//! The engine holds no mutable state of its own and is safe to share between
//! any number of concurrent callers. Conflict resolution on the
//! `(segment_id, user_id)` key is left to the store's atomic upsert.

use chrono::Utc;
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  assignment::{Assignment, MassAssignResult},
  segment::{NewSegment, Segment, SegmentPatch},
  store::{AssignmentStore, SegmentStore},
};

/// Accepted range for [`SegmentationEngine::mass_assign_segment`].
pub const PERCENT_RANGE: std::ops::RangeInclusive<u8> = 1..=100;

#[derive(Debug, Clone)]
pub struct SegmentationEngine<S, A> {
  segments:    S,
  assignments: A,
}

impl<S, A> SegmentationEngine<S, A>
where
  S: SegmentStore,
  A: AssignmentStore,
{
  pub fn new(segments: S, assignments: A) -> Self { Self { segments, assignments } }

  // ── Segments ──────────────────────────────────────────────────────────────

  /// Stamp the creation time and persist. Duplicate names are allowed.
  pub async fn create_segment(&self, draft: NewSegment) -> Result<Segment> {
    let segment = self
      .segments
      .create_segment(draft, Utc::now())
      .await
      .map_err(Into::into)?;
    debug!(segment_id = %segment.id, name = %segment.name, "created segment");
    Ok(segment)
  }

  pub async fn get_segment(&self, id: Uuid) -> Result<Segment> {
    self.require_segment(id).await
  }

  pub async fn list_segments(&self) -> Result<Vec<Segment>> {
    self.segments.list_segments().await.map_err(Into::into)
  }

  /// Merge `patch` over the stored segment and write the full result back.
  /// An empty patch returns the stored segment without writing.
  pub async fn update_segment(&self, id: Uuid, patch: SegmentPatch) -> Result<Segment> {
    let mut segment = self.require_segment(id).await?;
    if patch.is_empty() {
      return Ok(segment);
    }
    patch.apply(&mut segment);
    self.segments.update_segment(segment).await.map_err(Into::into)
  }

  /// Delete the segment. Its assignments are left in place; readers skip
  /// assignments whose segment no longer exists.
  pub async fn delete_segment(&self, id: Uuid) -> Result<()> {
    self.require_segment(id).await?;
    self.segments.delete_segment(id).await.map_err(Into::into)?;
    debug!(segment_id = %id, "deleted segment");
    Ok(())
  }

  // ── Assignments ───────────────────────────────────────────────────────────

  /// Assign `user_id` to an existing segment, refreshing the row if the user
  /// is already a member.
  pub async fn assign_user(&self, segment_id: Uuid, user_id: Uuid) -> Result<()> {
    self.require_segment(segment_id).await?;
    self.upsert_manual(segment_id, user_id).await?;
    debug!(%segment_id, %user_id, "assigned user");
    Ok(())
  }

  /// Remove the assignment. Unassigning a non-member is not an error.
  pub async fn unassign_user(&self, segment_id: Uuid, user_id: Uuid) -> Result<()> {
    self
      .assignments
      .remove_assignment(segment_id, user_id)
      .await
      .map_err(Into::into)
  }

  /// Segments the user is assigned to. Assignments pointing at deleted
  /// segments are skipped.
  pub async fn list_user_segments(&self, user_id: Uuid) -> Result<Vec<Segment>> {
    let assignments = self
      .assignments
      .list_by_user(user_id)
      .await
      .map_err(Into::into)?;

    let mut segments = Vec::with_capacity(assignments.len());
    for assignment in assignments {
      match self
        .segments
        .get_segment(assignment.segment_id)
        .await
        .map_err(Into::into)?
      {
        Some(segment) => segments.push(segment),
        None => debug!(
          segment_id = %assignment.segment_id,
          %user_id,
          "skipping orphaned assignment"
        ),
      }
    }
    Ok(segments)
  }

  pub async fn list_segment_users(&self, segment_id: Uuid) -> Result<Vec<Uuid>> {
    let assignments = self
      .assignments
      .list_by_segment(segment_id)
      .await
      .map_err(Into::into)?;
    Ok(assignments.into_iter().map(|a| a.user_id).collect())
  }

  // ── Mass assignment ───────────────────────────────────────────────────────

  /// Assign a uniformly random `percent` of the known users to a segment.
  ///
  /// Known users are every distinct user id in the assignment relation. The
  /// number selected is `floor(total * percent / 100)`, raised to 1 when that
  /// rounds down to zero.
  ///
  /// Writes are issued one user at a time and are not transactional: if a
  /// write fails with anything other than [`Error::Conflict`] the error is
  /// returned and the assignments already written stay in place. Conflicts
  /// are counted as `skipped` and the run continues.
  pub async fn mass_assign_segment<R>(
    &self,
    segment_id: Uuid,
    percent: u8,
    rng: &mut R,
  ) -> Result<MassAssignResult>
  where
    R: Rng + ?Sized + Send,
  {
    if !PERCENT_RANGE.contains(&percent) {
      return Err(Error::InvalidInput(format!(
        "percent must be between 1 and 100, got {percent}"
      )));
    }
    self.require_segment(segment_id).await?;

    let mut population = self.assignments.all_user_ids().await.map_err(Into::into)?;
    if population.is_empty() {
      return Ok(MassAssignResult::default());
    }

    let count = selection_size(population.len(), percent);
    population.shuffle(rng);

    let mut tally = MassAssignResult {
      total_users: population.len(),
      ..MassAssignResult::default()
    };
    for &user_id in &population[..count] {
      let outcome = self.upsert_manual(segment_id, user_id).await;
      tally = record(tally, outcome)?;
    }

    info!(
      %segment_id,
      percent,
      total_users = tally.total_users,
      assigned = tally.assigned,
      skipped = tally.skipped,
      "mass assignment finished"
    );
    Ok(tally)
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn require_segment(&self, id: Uuid) -> Result<Segment> {
    self
      .segments
      .get_segment(id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SegmentNotFound(id))
  }

  async fn upsert_manual(&self, segment_id: Uuid, user_id: Uuid) -> Result<()> {
    self
      .assignments
      .add_assignment(Assignment::manual(segment_id, user_id, Utc::now()))
      .await
      .map_err(Into::into)
  }
}

/// `max(1, floor(total * percent / 100))`, for `total >= 1`.
fn selection_size(total: usize, percent: u8) -> usize {
  (total * usize::from(percent) / 100).max(1)
}

/// Fold one write outcome into the running tally. Hard errors end the run.
fn record(mut tally: MassAssignResult, outcome: Result<()>) -> Result<MassAssignResult> {
  match outcome {
    Ok(()) => tally.assigned += 1,
    Err(Error::Conflict { segment_id, user_id }) => {
      warn!(%segment_id, %user_id, "assignment conflict, skipping");
      tally.skipped += 1;
    }
    Err(e) => return Err(e),
  }
  Ok(tally)
}
