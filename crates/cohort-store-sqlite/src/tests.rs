//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use cohort_core::{
  SegmentationEngine,
  assignment::{Assignment, AssignmentType, MassAssignResult},
  segment::{NewSegment, SegmentPatch, SegmentType},
  store::{AssignmentStore, SegmentStore},
};
use rand::{SeedableRng, rngs::StdRng};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn draft(name: &str) -> NewSegment {
  NewSegment {
    name:         name.into(),
    segment_type: SegmentType::DynamicRule,
    config:       serde_json::json!({ "rules": [{ "attr": "plan", "eq": "pro" }] }),
    description:  "paying customers".into(),
    is_active:    true,
  }
}

// ─── Segments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_segment() {
  let s = store().await;

  let created = s.create_segment(draft("pro"), Utc::now()).await.unwrap();
  let fetched = s.get_segment(created.id).await.unwrap();

  assert_eq!(fetched, Some(created));
}

#[tokio::test]
async fn get_segment_missing_returns_none() {
  let s = store().await;
  assert!(s.get_segment(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_segments_newest_first() {
  let s = store().await;
  let base = Utc::now();
  let old = s.create_segment(draft("old"), base - Duration::hours(2)).await.unwrap();
  let new = s.create_segment(draft("new"), base).await.unwrap();
  let mid = s.create_segment(draft("mid"), base - Duration::hours(1)).await.unwrap();

  let ids: Vec<Uuid> = s.list_segments().await.unwrap().into_iter().map(|s| s.id).collect();
  assert_eq!(ids, vec![new.id, mid.id, old.id]);
}

#[tokio::test]
async fn update_overwrites_mutable_fields_but_not_created_on() {
  let s = store().await;
  let created = s.create_segment(draft("pro"), Utc::now()).await.unwrap();

  let mut changed = created.clone();
  changed.name = "enterprise".into();
  changed.segment_type = SegmentType::Static;
  changed.config = serde_json::json!(null);
  changed.description = String::new();
  changed.is_active = false;
  changed.created_on = created.created_on + Duration::days(30);

  let updated = s.update_segment(changed).await.unwrap();
  assert_eq!(updated.name, "enterprise");
  assert_eq!(updated.segment_type, SegmentType::Static);
  assert_eq!(updated.config, serde_json::Value::Null);
  assert!(!updated.is_active);
  assert_eq!(updated.created_on, created.created_on);
  assert_eq!(s.get_segment(created.id).await.unwrap(), Some(updated));
}

#[tokio::test]
async fn update_missing_segment_errors() {
  let s = store().await;
  let ghost = draft("ghost").into_segment(Uuid::new_v4(), Utc::now());
  let err = s.update_segment(ghost).await.unwrap_err();
  assert!(matches!(err, crate::Error::SegmentNotFound(_)));
}

#[tokio::test]
async fn delete_segment_and_missing_delete_errors() {
  let s = store().await;
  let created = s.create_segment(draft("pro"), Utc::now()).await.unwrap();

  s.delete_segment(created.id).await.unwrap();
  assert!(s.get_segment(created.id).await.unwrap().is_none());

  let err = s.delete_segment(created.id).await.unwrap_err();
  assert!(matches!(err, crate::Error::SegmentNotFound(id) if id == created.id));
}

// ─── Assignments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_assignment_upserts_in_place() {
  let s = store().await;
  let (seg, user) = (Uuid::new_v4(), Uuid::new_v4());
  let first = Utc::now() - Duration::minutes(5);
  let second = Utc::now();

  s.add_assignment(Assignment::manual(seg, user, first)).await.unwrap();
  s.add_assignment(Assignment {
    segment_id:      seg,
    user_id:         user,
    assignment_type: AssignmentType::Auto,
    assigned_at:     second,
  })
  .await
  .unwrap();

  let rows = s.list_by_segment(seg).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].assignment_type, AssignmentType::Auto);
  assert_eq!(rows[0].assigned_at, second);
}

#[tokio::test]
async fn concurrent_upserts_of_same_pair_leave_one_row() {
  let s = store().await;
  let (seg, user) = (Uuid::new_v4(), Uuid::new_v4());

  let handles: Vec<_> = (0..16)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move {
        s.add_assignment(Assignment::manual(seg, user, Utc::now())).await
      })
    })
    .collect();
  for h in handles {
    h.await.unwrap().unwrap();
  }

  assert_eq!(s.list_by_segment(seg).await.unwrap().len(), 1);
}

#[tokio::test]
async fn remove_assignment_is_idempotent() {
  let s = store().await;
  let (seg, user) = (Uuid::new_v4(), Uuid::new_v4());
  s.add_assignment(Assignment::manual(seg, user, Utc::now())).await.unwrap();

  s.remove_assignment(seg, user).await.unwrap();
  s.remove_assignment(seg, user).await.unwrap();
  assert!(s.list_by_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_by_user_and_by_segment() {
  let s = store().await;
  let (seg_a, seg_b) = (Uuid::new_v4(), Uuid::new_v4());
  let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
  let now = Utc::now();

  s.add_assignment(Assignment::manual(seg_a, alice, now)).await.unwrap();
  s.add_assignment(Assignment::manual(seg_b, alice, now)).await.unwrap();
  s.add_assignment(Assignment::manual(seg_a, bob, now)).await.unwrap();

  let by_alice = s.list_by_user(alice).await.unwrap();
  assert_eq!(by_alice.len(), 2);
  assert!(by_alice.iter().all(|a| a.user_id == alice));

  let in_a = s.list_by_segment(seg_a).await.unwrap();
  assert_eq!(in_a.len(), 2);
  assert!(in_a.iter().all(|a| a.segment_id == seg_a));
}

#[tokio::test]
async fn all_user_ids_distinct_and_sorted() {
  let s = store().await;
  let users: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
  for seg in [Uuid::new_v4(), Uuid::new_v4()] {
    for &u in &users {
      s.add_assignment(Assignment::manual(seg, u, Utc::now())).await.unwrap();
    }
  }

  let mut expected = users.clone();
  expected.sort();
  assert_eq!(s.all_user_ids().await.unwrap(), expected);
}

#[tokio::test]
async fn all_user_ids_empty_store() {
  let s = store().await;
  assert!(s.all_user_ids().await.unwrap().is_empty());
}

/// Install a trigger that aborts any insert for `user_id`, standing in for a
/// non-uniqueness constraint failure.
async fn reject_inserts_for(s: &SqliteStore, user_id: Uuid) {
  let sql = format!(
    "CREATE TRIGGER reject_user BEFORE INSERT ON user_segment_assignment
     WHEN NEW.user_id = '{}'
     BEGIN SELECT RAISE(ABORT, 'user is blocked'); END;",
    crate::encode::encode_uuid(user_id),
  );
  s.conn
    .call(move |conn| {
      conn.execute_batch(&sql)?;
      Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn trigger_rejection_is_a_database_error_not_a_conflict() {
  let s = store().await;
  let seg = s.create_segment(draft("pro"), Utc::now()).await.unwrap();
  let user = Uuid::new_v4();
  reject_inserts_for(&s, user).await;

  let err = s
    .add_assignment(Assignment {
      segment_id:      seg.id,
      user_id:         user,
      assignment_type: AssignmentType::Manual,
      assigned_at:     Utc::now(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Database(_)), "got {err:?}");
}

// ─── Engine over SQLite ──────────────────────────────────────────────────────

fn engine(s: &SqliteStore) -> SegmentationEngine<SqliteStore, SqliteStore> {
  SegmentationEngine::new(s.clone(), s.clone())
}

#[tokio::test]
async fn engine_partial_update_roundtrip() {
  let s = store().await;
  let e = engine(&s);
  let seg = e.create_segment(draft("pro")).await.unwrap();

  let updated = e
    .update_segment(seg.id, SegmentPatch {
      description: Some("annual plans only".into()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.description, "annual plans only");
  assert_eq!(updated.name, seg.name);
  assert_eq!(updated.config, seg.config);
  assert_eq!(e.get_segment(seg.id).await.unwrap(), updated);
}

#[tokio::test]
async fn engine_mass_assign_thirty_percent_of_ten() {
  let s = store().await;
  let e = engine(&s);

  let seed = e.create_segment(draft("seed")).await.unwrap();
  for _ in 0..10 {
    e.assign_user(seed.id, Uuid::new_v4()).await.unwrap();
  }
  let target = e.create_segment(draft("target")).await.unwrap();

  let result = e
    .mass_assign_segment(target.id, 30, &mut StdRng::seed_from_u64(42))
    .await
    .unwrap();
  assert_eq!(result, MassAssignResult { total_users: 10, assigned: 3, skipped: 0 });

  let members = e.list_segment_users(target.id).await.unwrap();
  assert_eq!(members.len(), 3);
  let population = s.all_user_ids().await.unwrap();
  assert!(members.iter().all(|m| population.contains(m)));
}

#[tokio::test]
async fn engine_mass_assign_refreshes_existing_members() {
  let s = store().await;
  let e = engine(&s);
  let target = e.create_segment(draft("target")).await.unwrap();
  let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
  for &u in &users {
    e.assign_user(target.id, u).await.unwrap();
  }

  let result = e
    .mass_assign_segment(target.id, 100, &mut StdRng::seed_from_u64(5))
    .await
    .unwrap();
  assert_eq!(result, MassAssignResult { total_users: 4, assigned: 4, skipped: 0 });
  assert_eq!(e.list_segment_users(target.id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn engine_mass_assign_aborts_on_non_duplicate_constraint_failure() {
  let s = store().await;
  let e = engine(&s);
  let seed = e.create_segment(draft("seed")).await.unwrap();
  let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
  for &u in &users {
    e.assign_user(seed.id, u).await.unwrap();
  }
  let target = e.create_segment(draft("target")).await.unwrap();
  reject_inserts_for(&s, users[2]).await;

  let err = e
    .mass_assign_segment(target.id, 100, &mut StdRng::seed_from_u64(9))
    .await
    .unwrap_err();
  assert!(matches!(err, cohort_core::Error::Storage(_)), "got {err:?}");
  assert!(!e.list_segment_users(target.id).await.unwrap().contains(&users[2]));
}

#[tokio::test]
async fn engine_list_user_segments_tolerates_orphans() {
  let s = store().await;
  let e = engine(&s);
  let kept = e.create_segment(draft("kept")).await.unwrap();
  let gone = e.create_segment(draft("gone")).await.unwrap();
  let user = Uuid::new_v4();
  e.assign_user(kept.id, user).await.unwrap();
  e.assign_user(gone.id, user).await.unwrap();

  e.delete_segment(gone.id).await.unwrap();

  // The orphaned row is still there, but is not surfaced.
  assert_eq!(s.list_by_user(user).await.unwrap().len(), 2);
  let segments = e.list_user_segments(user).await.unwrap();
  assert_eq!(segments.len(), 1);
  assert_eq!(segments[0].id, kept.id);
}

#[tokio::test]
async fn engine_delete_missing_segment_is_not_found() {
  let s = store().await;
  let err = engine(&s).delete_segment(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, cohort_core::Error::SegmentNotFound(_)));
}

#[test]
fn store_errors_map_into_core_taxonomy() {
  let id = Uuid::new_v4();
  let core: cohort_core::Error = crate::Error::SegmentNotFound(id).into();
  assert!(matches!(core, cohort_core::Error::SegmentNotFound(x) if x == id));

  let core: cohort_core::Error = crate::Error::Conflict { segment_id: id, user_id: id }.into();
  assert!(matches!(core, cohort_core::Error::Conflict { .. }));

  let core: cohort_core::Error = crate::Error::DateParse("bad".into()).into();
  assert!(matches!(core, cohort_core::Error::Storage(_)));
}
