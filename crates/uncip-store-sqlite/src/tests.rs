//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use uncip_core::{
  principal::{Role, SubjectId},
  record::{AlertInsert, AlertStatus, ChildProfile, NewAlert, NewChild},
  store::{IdentityProvider, SafetyStore, UserDirectory},
  user::{FederatedIdentity, IdentityClaims, NewUser},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn sid(s: &str) -> SubjectId { SubjectId::from(s) }

fn new_child(name: &str) -> NewChild {
  NewChild::new(
    "p1",
    ChildProfile {
      full_name:     name.into(),
      medical_notes: Some("asthma".into()),
      ..Default::default()
    },
  )
}

fn new_alert(child_id: Uuid, alert_type: &str) -> NewAlert {
  NewAlert {
    child_id,
    alert_type:         alert_type.into(),
    description:        Some("last seen near the park".into()),
    last_seen_location: Some("Central Park".into()),
    created_by:         "p1".into(),
  }
}

// ─── Children ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_child() {
  let s = store().await;

  let mut input = new_child("Ada");
  input.parent_id = Some(sid("p1"));
  input.guardians = Some(vec![sid("p1"), sid("g2")]);
  input.school_id = Some("s1".into());

  let child = s.insert_child(input).await.unwrap();
  let fetched = s.get_child(child.id).await.unwrap().unwrap();
  assert_eq!(fetched, child);
  assert_eq!(fetched.profile.medical_notes.as_deref(), Some("asthma"));
}

#[tokio::test]
async fn absent_guardians_stay_absent() {
  let s = store().await;
  let absent = s.insert_child(new_child("A")).await.unwrap();
  let mut input = new_child("B");
  input.guardians = Some(vec![]);
  let empty = s.insert_child(input).await.unwrap();

  assert_eq!(s.get_child(absent.id).await.unwrap().unwrap().guardians, None);
  assert_eq!(s.get_child(empty.id).await.unwrap().unwrap().guardians, Some(vec![]));
}

#[tokio::test]
async fn get_child_missing_returns_none() {
  let s = store().await;
  assert!(s.get_child(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn children_by_parent_and_guardian_are_separate_predicates() {
  let s = store().await;

  let mut current = new_child("Current");
  current.parent_id = Some(sid("p1"));
  let current = s.insert_child(current).await.unwrap();

  let mut legacy = new_child("Legacy");
  legacy.guardians = Some(vec![sid("g0"), sid("p1"), sid("p1")]);
  let legacy = s.insert_child(legacy).await.unwrap();

  let mut other = new_child("Other");
  other.parent_id = Some(sid("p2"));
  other.guardians = Some(vec![sid("p10")]);
  s.insert_child(other).await.unwrap();

  let by_parent = s.children_by_parent(sid("p1")).await.unwrap();
  assert_eq!(by_parent.len(), 1);
  assert_eq!(by_parent[0].id, current.id);

  let by_guardian = s.children_by_guardian(sid("p1")).await.unwrap();
  assert_eq!(by_guardian.len(), 1);
  assert_eq!(by_guardian[0].id, legacy.id);

  assert_eq!(s.list_children().await.unwrap().len(), 3);
}

#[tokio::test]
async fn children_by_school() {
  let s = store().await;
  for school in ["s1", "s1", "s2"] {
    let mut input = new_child("Kid");
    input.school_id = Some(school.into());
    s.insert_child(input).await.unwrap();
  }
  s.insert_child(new_child("Unassigned")).await.unwrap();

  assert_eq!(s.children_by_school("s1".into()).await.unwrap().len(), 2);
  assert_eq!(s.children_by_school("s3".into()).await.unwrap().len(), 0);
}

#[tokio::test]
async fn save_child_overwrites() {
  let s = store().await;
  let mut child = s.insert_child(new_child("Ada")).await.unwrap();
  child.profile.full_name = "Ada L.".into();
  child.guardians = Some(vec![sid("p1")]);
  s.save_child(child.clone()).await.unwrap();

  let fetched = s.get_child(child.id).await.unwrap().unwrap();
  assert_eq!(fetched.profile.full_name, "Ada L.");
  assert_eq!(fetched.guardians, Some(vec![sid("p1")]));
}

#[tokio::test]
async fn save_missing_child_errors() {
  let s = store().await;
  let mut child = s.insert_child(new_child("Ada")).await.unwrap();
  child.id = Uuid::new_v4();
  let missing = child.id;
  let err = s.save_child(child).await.unwrap_err();
  assert!(matches!(err, Error::ChildNotFound(id) if id == missing));
  assert!(matches!(
    uncip_core::Error::from(err),
    uncip_core::Error::ChildNotFound(id) if id == missing
  ));
}

#[tokio::test]
async fn delete_child_cascades_to_alerts() {
  let s = store().await;
  let child = s.insert_child(new_child("Ada")).await.unwrap();
  s.insert_alert_unless_active_duplicate(new_alert(child.id, "missing"))
    .await
    .unwrap();

  assert!(s.delete_child(child.id).await.unwrap());
  assert!(s.get_child(child.id).await.unwrap().is_none());
  assert!(s.list_alerts(None).await.unwrap().is_empty());
  assert!(!s.delete_child(child.id).await.unwrap());
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn alert_insert_writes_both_type_fields() {
  let s = store().await;
  let child = s.insert_child(new_child("Ada")).await.unwrap();

  let alert = match s
    .insert_alert_unless_active_duplicate(new_alert(child.id, "missing"))
    .await
    .unwrap()
  {
    AlertInsert::Inserted(a) => a,
    other => panic!("expected insert, got {other:?}"),
  };
  assert_eq!(alert.status, AlertStatus::Active);

  let fetched = s.get_alert(alert.id).await.unwrap().unwrap();
  assert_eq!(fetched, alert);
  assert_eq!(fetched.alert_type.as_deref(), Some("missing"));
  assert_eq!(fetched.legacy_type.as_deref(), Some("missing"));
}

#[tokio::test]
async fn conditional_insert_rejects_active_duplicate() {
  let s = store().await;
  let child = s.insert_child(new_child("Ada")).await.unwrap();

  let first = s
    .insert_alert_unless_active_duplicate(new_alert(child.id, "missing"))
    .await
    .unwrap();
  let AlertInsert::Inserted(first) = first else { panic!("first insert") };

  match s
    .insert_alert_unless_active_duplicate(new_alert(child.id, "missing"))
    .await
    .unwrap()
  {
    AlertInsert::Duplicate(existing) => assert_eq!(existing.id, first.id),
    other => panic!("expected duplicate, got {other:?}"),
  }

  assert!(matches!(
    s.insert_alert_unless_active_duplicate(new_alert(child.id, "medical")).await.unwrap(),
    AlertInsert::Inserted(_)
  ));
  assert_eq!(s.alerts_for_child(child.id, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn conditional_insert_matches_legacy_type_column() {
  let s = store().await;
  let child = s.insert_child(new_child("Ada")).await.unwrap();
  let child_str = child.id.hyphenated().to_string();

  // A row written by an older client: only the legacy column is populated.
  s.conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO alerts (alert_id, child_id, status, type, created_by, created_at, updated_at)
         VALUES (?1, ?2, 'active', 'missing', 'parent', ?3, ?3)",
        rusqlite::params![
          Uuid::new_v4().hyphenated().to_string(),
          child_str,
          chrono::Utc::now().to_rfc3339(),
        ],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  assert!(matches!(
    s.insert_alert_unless_active_duplicate(new_alert(child.id, "missing")).await.unwrap(),
    AlertInsert::Duplicate(d) if d.alert_type.is_none() && d.created_by == "parent"
  ));
}

#[tokio::test]
async fn closed_alerts_do_not_block() {
  let s = store().await;
  let child = s.insert_child(new_child("Ada")).await.unwrap();
  let AlertInsert::Inserted(mut first) = s
    .insert_alert_unless_active_duplicate(new_alert(child.id, "missing"))
    .await
    .unwrap()
  else {
    panic!("first insert")
  };

  let at = chrono::Utc::now();
  first.status = AlertStatus::Resolved;
  first.resolved_at = Some(at);
  first.updated_at = at;
  s.save_alert(first.clone()).await.unwrap();

  let fetched = s.get_alert(first.id).await.unwrap().unwrap();
  assert_eq!(fetched.status, AlertStatus::Resolved);
  assert!(fetched.resolved_at.is_some());

  assert!(matches!(
    s.insert_alert_unless_active_duplicate(new_alert(child.id, "missing")).await.unwrap(),
    AlertInsert::Inserted(_)
  ));
  assert_eq!(s.list_alerts(Some(AlertStatus::Active)).await.unwrap().len(), 1);
  assert_eq!(s.list_alerts(Some(AlertStatus::Resolved)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn alert_for_vanished_child_is_not_found() {
  let s = store().await;
  let child = s.insert_child(new_child("Ada")).await.unwrap();
  s.delete_child(child.id).await.unwrap();

  let err = s
    .insert_alert_unless_active_duplicate(new_alert(child.id, "missing"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ChildNotFound(id) if id == child.id));
  assert!(matches!(
    uncip_core::Error::from(err),
    uncip_core::Error::ChildNotFound(id) if id == child.id
  ));
  assert!(s.list_alerts(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn save_alert_after_cascade_is_not_found() {
  let s = store().await;
  let child = s.insert_child(new_child("Ada")).await.unwrap();
  let AlertInsert::Inserted(alert) = s
    .insert_alert_unless_active_duplicate(new_alert(child.id, "missing"))
    .await
    .unwrap()
  else {
    panic!("first insert")
  };
  s.delete_child(child.id).await.unwrap();

  let err = uncip_core::Error::from(s.save_alert(alert.clone()).await.unwrap_err());
  assert!(matches!(err, uncip_core::Error::AlertNotFound(id) if id == alert.id));
  assert!(!err.is_retryable());
}

#[tokio::test]
async fn concurrent_creates_yield_one_active_alert() {
  let s = Arc::new(store().await);
  let child = s.insert_child(new_child("Ada")).await.unwrap();

  let mut handles = Vec::new();
  for _ in 0..8 {
    let s = s.clone();
    let child_id = child.id;
    handles.push(tokio::spawn(async move {
      s.insert_alert_unless_active_duplicate(new_alert(child_id, "missing"))
        .await
        .unwrap()
    }));
  }

  let mut inserted = 0;
  for h in handles {
    if matches!(h.await.unwrap(), AlertInsert::Inserted(_)) {
      inserted += 1;
    }
  }
  assert_eq!(inserted, 1);
  assert_eq!(
    s.alerts_for_child(child.id, Some(AlertStatus::Active)).await.unwrap().len(),
    1
  );
}

// ─── Users and identities ────────────────────────────────────────────────────

fn new_user(email: &str, role: Role) -> NewUser {
  NewUser {
    email:        email.into(),
    password:     Some("plain".into()),
    role,
    is_admin:     false,
    school_id:    Some("s1".into()),
    display_name: None,
  }
}

#[tokio::test]
async fn add_and_find_user() {
  let s = store().await;
  let user = s.add_user(new_user("Staff@School.org", Role::School)).await.unwrap();
  assert_eq!(user.email, "staff@school.org");

  let found = s.find_user_by_email("staff@school.org".into()).await.unwrap().unwrap();
  assert_eq!(found, user);
  assert_eq!(found.password.as_deref(), Some("plain"));
  assert!(s.find_user_by_email("nobody@school.org".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  s.add_user(new_user("a@example.com", Role::Parent)).await.unwrap();
  assert!(matches!(
    s.add_user(new_user("A@example.com", Role::Parent)).await,
    Err(Error::EmailTaken(e)) if e == "a@example.com"
  ));
  assert_eq!(s.list_users().await.unwrap().len(), 1);

  let err = uncip_core::Error::from(
    s.add_user(new_user("a@example.com", Role::Parent)).await.unwrap_err(),
  );
  assert!(matches!(err, uncip_core::Error::UserExists(ref e) if e == "a@example.com"));
  assert!(!err.is_retryable());
}

#[tokio::test]
async fn identity_lookup_is_case_insensitive() {
  let s = store().await;
  s.add_identity(FederatedIdentity {
    uid:    sid("fed-1"),
    email:  "Officer@Police.gov".into(),
    claims: IdentityClaims {
      role:      Some("authority".into()),
      admin:     false,
      school_id: None,
    },
  })
  .await
  .unwrap();

  let found = s.lookup_identity("officer@police.GOV".into()).await.unwrap().unwrap();
  assert_eq!(found.uid, sid("fed-1"));
  assert_eq!(found.claims.role.as_deref(), Some("authority"));
  assert!(s.lookup_identity("x@police.gov".into()).await.unwrap().is_none());
}
