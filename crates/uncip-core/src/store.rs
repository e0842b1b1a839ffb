//! Store traits consumed by the evaluator, verifier and record service.
//!
//! The traits are implemented by storage backends (e.g.
//! `uncip-store-sqlite`). Queries are limited to the predicates a document
//! store offers: field equality and array containment.
//!
//! Each backend error converts into [`crate::Error`]; conflicts keep their
//! meaning and only outages become `StoreUnavailable`.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  principal::SubjectId,
  record::{AlertInsert, AlertRecord, AlertStatus, ChildRecord, NewAlert, NewChild},
  user::{FederatedIdentity, NewUser, UserRecord},
};

/// Child profiles and the alerts raised about them.
pub trait SafetyStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Children ──────────────────────────────────────────────────────────

  /// Persist a new child; the store assigns the id and timestamps.
  fn insert_child(
    &self,
    input: NewChild,
  ) -> impl Future<Output = Result<ChildRecord, Self::Error>> + Send + '_;

  fn get_child(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ChildRecord>, Self::Error>> + Send + '_;

  /// Overwrite an existing child record in full.
  fn save_child(
    &self,
    record: ChildRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a child and every alert attached to it. Returns `false` if the
  /// child did not exist.
  fn delete_child(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_children(
    &self,
  ) -> impl Future<Output = Result<Vec<ChildRecord>, Self::Error>> + Send + '_;

  /// `where parent_id == parent`
  fn children_by_parent(
    &self,
    parent: SubjectId,
  ) -> impl Future<Output = Result<Vec<ChildRecord>, Self::Error>> + Send + '_;

  /// `where guardians array-contains guardian`
  fn children_by_guardian(
    &self,
    guardian: SubjectId,
  ) -> impl Future<Output = Result<Vec<ChildRecord>, Self::Error>> + Send + '_;

  /// `where school_id == school_id`
  fn children_by_school(
    &self,
    school_id: String,
  ) -> impl Future<Output = Result<Vec<ChildRecord>, Self::Error>> + Send + '_;

  // ── Alerts ────────────────────────────────────────────────────────────

  fn get_alert(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AlertRecord>, Self::Error>> + Send + '_;

  /// Alerts for one child, optionally restricted to a status.
  fn alerts_for_child(
    &self,
    child_id: Uuid,
    status: Option<AlertStatus>,
  ) -> impl Future<Output = Result<Vec<AlertRecord>, Self::Error>> + Send + '_;

  /// Every alert, optionally restricted to a status.
  fn list_alerts(
    &self,
    status: Option<AlertStatus>,
  ) -> impl Future<Output = Result<Vec<AlertRecord>, Self::Error>> + Send + '_;

  /// Insert an active alert unless the child already has an active alert
  /// whose `alert_type` or legacy `type` equals `input.alert_type`.
  ///
  /// The scan and the insert must be atomic with respect to other calls for
  /// the same child.
  fn insert_alert_unless_active_duplicate(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<AlertInsert, Self::Error>> + Send + '_;

  /// Overwrite an existing alert in full.
  fn save_alert(
    &self,
    alert: AlertRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// The primary user directory.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Look up a user by email. Callers pass the address lower-cased.
  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + '_;

  /// Create a user; the uid and `created_at` are assigned by the store.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserRecord, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<UserRecord>, Self::Error>> + Send + '_;
}

/// A secondary, federated identity store consulted when the user directory
/// has no match.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  fn lookup_identity(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<FederatedIdentity>, Self::Error>> + Send + '_;
}
