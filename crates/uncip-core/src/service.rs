//! [`RecordService`]: authorized operations over children, alerts and users.
//!
//! Each method resolves the target record, asks the
//! [`AccessControlEvaluator`] for a decision, and only then touches the
//! store. Handlers call these methods; they never reach the store directly.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  access::{AccessControlEvaluator, EvaluatorPolicy, Operation},
  credentials::hash_password,
  lifecycle::{self, Transition},
  principal::{Principal, Role},
  record::{
    AlertInsert, AlertRecord, AlertStatus, ChildRecord, ChildUpdate, NewAlert,
    NewChild,
  },
  store::{SafetyStore, UserDirectory},
  user::{NewUser, UserRecord},
};

/// Caller-supplied fields of a new alert; the child and creator come from
/// the request context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInput {
  /// Accepted as either `alertType` or the legacy `type`.
  #[serde(alias = "type")]
  pub alert_type:         String,
  pub description:        Option<String>,
  pub last_seen_location: Option<String>,
}

pub struct RecordService<S> {
  store:     Arc<S>,
  evaluator: AccessControlEvaluator<S>,
}

impl<S> Clone for RecordService<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), evaluator: self.evaluator.clone() }
  }
}

impl<S> RecordService<S> {
  pub fn new(store: Arc<S>, policy: EvaluatorPolicy) -> Self {
    let evaluator = AccessControlEvaluator::with_policy(store.clone(), policy);
    Self { store, evaluator }
  }

  pub fn evaluator(&self) -> &AccessControlEvaluator<S> { &self.evaluator }
}

impl<S> RecordService<S>
where
  S: SafetyStore,
{
  // ── Children ──────────────────────────────────────────────────────────

  pub async fn create_child(
    &self,
    principal: &Principal,
    mut input: NewChild,
  ) -> Result<ChildRecord> {
    self.evaluator.can_create_child(principal).require()?;
    input.created_by = principal.subject_id.clone();
    let input = self.evaluator.apply_ownership_on_create(input, principal);
    let child = self.store.insert_child(input).await.map_err(Error::from_store)?;
    tracing::info!(child = %child.id, by = %principal.subject_id, "child profile created");
    Ok(child)
  }

  pub async fn get_child(
    &self,
    principal: &Principal,
    id: Uuid,
  ) -> Result<ChildRecord> {
    let child = self.load_child(id).await?;
    self
      .evaluator
      .can_access_child(principal, Operation::Read, &child)
      .require()?;
    Ok(child)
  }

  /// Ownership fields may only be rewritten by an admin, and a school may
  /// not move a child out of its own school. Re-sending the school it
  /// already has is allowed.
  pub async fn update_child(
    &self,
    principal: &Principal,
    id: Uuid,
    update: ChildUpdate,
  ) -> Result<ChildRecord> {
    let mut child = self.load_child(id).await?;
    self
      .evaluator
      .can_access_child(principal, Operation::Update, &child)
      .require()?;

    if update.touches_ownership() && !principal.is_admin() {
      return Err(Error::Forbidden);
    }
    if principal.role == Role::School
      && let Some(school_id) = &update.school_id
      && school_id.as_deref() != principal.school_id.as_deref()
    {
      return Err(Error::Forbidden);
    }

    update.apply_to(&mut child, Utc::now());
    self.store.save_child(child.clone()).await.map_err(Error::from_store)?;
    Ok(child)
  }

  pub async fn delete_child(&self, principal: &Principal, id: Uuid) -> Result<()> {
    let child = self.load_child(id).await?;
    self
      .evaluator
      .can_access_child(principal, Operation::Delete, &child)
      .require()?;
    if !self.store.delete_child(id).await.map_err(Error::from_store)? {
      return Err(Error::ChildNotFound(id));
    }
    tracing::info!(child = %id, by = %principal.subject_id, "child profile deleted");
    Ok(())
  }

  /// The children visible to `principal`, oldest first.
  pub async fn list_children(&self, principal: &Principal) -> Result<Vec<ChildRecord>> {
    let mut children = match principal.role {
      Role::Admin | Role::Authority => {
        self.store.list_children().await.map_err(Error::from_store)?
      }
      Role::School => match &principal.school_id {
        Some(school) => self
          .store
          .children_by_school(school.clone())
          .await
          .map_err(Error::from_store)?,
        None => Vec::new(),
      },
      Role::Parent => {
        let by_parent = self
          .store
          .children_by_parent(principal.subject_id.clone())
          .await
          .map_err(Error::from_store)?;
        let by_guardian = self
          .store
          .children_by_guardian(principal.subject_id.clone())
          .await
          .map_err(Error::from_store)?;
        let merged: BTreeMap<Uuid, ChildRecord> = by_parent
          .into_iter()
          .chain(by_guardian)
          .map(|c| (c.id, c))
          .collect();
        merged.into_values().collect()
      }
      Role::Community => return Err(Error::Forbidden),
    };
    children.sort_by_key(|c| c.created_at);
    Ok(children)
  }

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Raise an active alert about `child_id`.
  ///
  /// Rejected with [`Error::DuplicateActive`] when the child already has an
  /// active alert of the same type, under either type field.
  pub async fn create_alert(
    &self,
    principal: &Principal,
    child_id: Uuid,
    input: AlertInput,
  ) -> Result<AlertRecord> {
    let alert_type = input.alert_type.trim().to_owned();
    if alert_type.is_empty() {
      return Err(Error::Invalid("alert type must not be empty".into()));
    }

    let child = self.load_child(child_id).await?;
    self.evaluator.can_create_alert(principal, &child).require()?;

    let new = NewAlert {
      child_id,
      alert_type: alert_type.clone(),
      description: input.description,
      last_seen_location: input.last_seen_location,
      created_by: principal.subject_id.to_string(),
    };
    match self
      .store
      .insert_alert_unless_active_duplicate(new)
      .await
      .map_err(Error::from_store)?
    {
      AlertInsert::Inserted(alert) => {
        tracing::info!(
          alert = %alert.id,
          child = %child_id,
          %alert_type,
          by = %principal.subject_id,
          "alert raised"
        );
        Ok(alert)
      }
      AlertInsert::Duplicate(existing) => {
        tracing::info!(child = %child_id, %alert_type, existing = %existing.id, "duplicate alert rejected");
        Err(Error::DuplicateActive { child_id, alert_type, existing: existing.id })
      }
    }
  }

  pub async fn get_alert(&self, principal: &Principal, id: Uuid) -> Result<AlertRecord> {
    let alert = self.load_alert(id).await?;
    self.evaluator.can_read_alert(principal, &alert).await?.require()?;
    Ok(alert)
  }

  pub async fn list_alerts_for_child(
    &self,
    principal: &Principal,
    child_id: Uuid,
    status: Option<AlertStatus>,
  ) -> Result<Vec<AlertRecord>> {
    self.get_child(principal, child_id).await?;
    let mut alerts = self
      .store
      .alerts_for_child(child_id, status)
      .await
      .map_err(Error::from_store)?;
    alerts.sort_by_key(|a| a.created_at);
    Ok(alerts)
  }

  /// Every alert the principal may read, oldest first.
  pub async fn list_alerts(
    &self,
    principal: &Principal,
    status: Option<AlertStatus>,
  ) -> Result<Vec<AlertRecord>> {
    let mut alerts = match principal.role {
      Role::Admin | Role::Authority => {
        self.store.list_alerts(status).await.map_err(Error::from_store)?
      }
      Role::School | Role::Parent => {
        let mut alerts = Vec::new();
        for child in self.list_children(principal).await? {
          alerts.extend(
            self
              .store
              .alerts_for_child(child.id, status)
              .await
              .map_err(Error::from_store)?,
          );
        }
        alerts
      }
      Role::Community => return Err(Error::Forbidden),
    };
    alerts.sort_by_key(|a| a.created_at);
    Ok(alerts)
  }

  pub async fn resolve_alert(&self, principal: &Principal, id: Uuid) -> Result<AlertRecord> {
    self.transition_alert(principal, id, AlertStatus::Resolved).await
  }

  pub async fn cancel_alert(&self, principal: &Principal, id: Uuid) -> Result<AlertRecord> {
    self.transition_alert(principal, id, AlertStatus::Cancelled).await
  }

  async fn transition_alert(
    &self,
    principal: &Principal,
    id: Uuid,
    to: AlertStatus,
  ) -> Result<AlertRecord> {
    let mut alert = self.load_alert(id).await?;
    let child = self.load_child(alert.child_id).await?;
    self.evaluator.can_transition_alert(principal, &child).require()?;

    if lifecycle::apply(&mut alert, to, Utc::now())? == Transition::Applied {
      self.store.save_alert(alert.clone()).await.map_err(Error::from_store)?;
      tracing::info!(alert = %id, status = %to, by = %principal.subject_id, "alert status changed");
    }
    Ok(alert)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn load_child(&self, id: Uuid) -> Result<ChildRecord> {
    self
      .store
      .get_child(id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::ChildNotFound(id))
  }

  async fn load_alert(&self, id: Uuid) -> Result<AlertRecord> {
    self
      .store
      .get_alert(id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::AlertNotFound(id))
  }
}

impl<S> RecordService<S>
where
  S: UserDirectory,
{
  // ── Users ─────────────────────────────────────────────────────────────

  /// Provision a directory user. `input.password` is the plaintext
  /// password; it is hashed only once the caller is known to be an admin.
  pub async fn add_user(&self, principal: &Principal, mut input: NewUser) -> Result<UserRecord> {
    if !principal.is_admin() {
      return Err(Error::Forbidden);
    }
    input.email = input.email.trim().to_lowercase();
    input.password = input.password.as_deref().map(hash_password).transpose()?;
    if self
      .store
      .find_user_by_email(input.email.clone())
      .await
      .map_err(Error::from_store)?
      .is_some()
    {
      return Err(Error::UserExists(input.email));
    }
    let user = self.store.add_user(input).await.map_err(Error::from_store)?;
    tracing::info!(uid = %user.uid, role = %user.effective_role(), "user added");
    Ok(user)
  }

  pub async fn list_users(&self, principal: &Principal) -> Result<Vec<UserRecord>> {
    if !principal.is_admin() {
      return Err(Error::Forbidden);
    }
    self.store.list_users().await.map_err(Error::from_store)
  }
}
