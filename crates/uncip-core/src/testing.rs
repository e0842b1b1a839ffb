//! In-memory store used by the unit tests in this crate.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  principal::SubjectId,
  record::{AlertInsert, AlertRecord, AlertStatus, ChildRecord, NewAlert, NewChild},
  store::{IdentityProvider, SafetyStore, UserDirectory},
  user::{FederatedIdentity, NewUser, UserRecord},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("injected read failure")]
  Injected,
  #[error("no such child: {0}")]
  NoChild(Uuid),
  #[error("no such alert: {0}")]
  NoAlert(Uuid),
  #[error("email taken: {0}")]
  EmailTaken(String),
}

impl From<MemoryError> for crate::Error {
  fn from(e: MemoryError) -> Self {
    match e {
      MemoryError::NoChild(id) => Self::ChildNotFound(id),
      MemoryError::NoAlert(id) => Self::AlertNotFound(id),
      MemoryError::EmailTaken(email) => Self::UserExists(email),
      injected @ MemoryError::Injected => Self::store(injected),
    }
  }
}

#[derive(Default)]
pub struct MemoryStore {
  children:   Mutex<HashMap<Uuid, ChildRecord>>,
  alerts:     Mutex<Vec<AlertRecord>>,
  users:      Mutex<Vec<UserRecord>>,
  identities: Mutex<Vec<FederatedIdentity>>,
  failing:    AtomicBool,
}

impl MemoryStore {
  /// Make every subsequent call fail with [`MemoryError::Injected`].
  pub fn fail_reads(&self, on: bool) { self.failing.store(on, Ordering::SeqCst); }

  fn check(&self) -> Result<(), MemoryError> {
    if self.failing.load(Ordering::SeqCst) {
      Err(MemoryError::Injected)
    } else {
      Ok(())
    }
  }

  /// Insert an alert written by an older client: only the legacy `type`
  /// field is set, and no duplicate check runs.
  pub fn push_legacy_alert(&self, child_id: Uuid, kind: &str, status: AlertStatus) {
    let now = Utc::now();
    self.alerts.lock().unwrap().push(AlertRecord {
      id: Uuid::new_v4(),
      child_id,
      status,
      alert_type: None,
      legacy_type: Some(kind.to_owned()),
      description: None,
      last_seen_location: None,
      created_by: "parent".into(),
      created_at: now,
      updated_at: now,
      resolved_at: None,
      cancelled_at: None,
    });
  }

  /// Insert a child record exactly as given, bypassing ownership stamping.
  pub fn put_child(&self, record: ChildRecord) {
    self.children.lock().unwrap().insert(record.id, record);
  }

  pub fn put_user(&self, user: UserRecord) { self.users.lock().unwrap().push(user); }

  pub fn put_identity(&self, identity: FederatedIdentity) {
    self.identities.lock().unwrap().push(identity);
  }
}

impl SafetyStore for MemoryStore {
  type Error = MemoryError;

  async fn insert_child(&self, input: NewChild) -> Result<ChildRecord, MemoryError> {
    self.check()?;
    let now = Utc::now();
    let record = ChildRecord {
      id:         Uuid::new_v4(),
      parent_id:  input.parent_id,
      guardians:  input.guardians,
      school_id:  input.school_id,
      profile:    input.profile,
      created_by: input.created_by,
      created_at: now,
      updated_at: now,
    };
    self.children.lock().unwrap().insert(record.id, record.clone());
    Ok(record)
  }

  async fn get_child(&self, id: Uuid) -> Result<Option<ChildRecord>, MemoryError> {
    self.check()?;
    Ok(self.children.lock().unwrap().get(&id).cloned())
  }

  async fn save_child(&self, record: ChildRecord) -> Result<(), MemoryError> {
    self.check()?;
    let mut children = self.children.lock().unwrap();
    match children.get_mut(&record.id) {
      Some(slot) => {
        *slot = record;
        Ok(())
      }
      None => Err(MemoryError::NoChild(record.id)),
    }
  }

  async fn delete_child(&self, id: Uuid) -> Result<bool, MemoryError> {
    self.check()?;
    let existed = self.children.lock().unwrap().remove(&id).is_some();
    self.alerts.lock().unwrap().retain(|a| a.child_id != id);
    Ok(existed)
  }

  async fn list_children(&self) -> Result<Vec<ChildRecord>, MemoryError> {
    self.check()?;
    Ok(self.children.lock().unwrap().values().cloned().collect())
  }

  async fn children_by_parent(&self, parent: SubjectId) -> Result<Vec<ChildRecord>, MemoryError> {
    self.check()?;
    Ok(
      self
        .children
        .lock()
        .unwrap()
        .values()
        .filter(|c| c.parent_id.as_ref() == Some(&parent))
        .cloned()
        .collect(),
    )
  }

  async fn children_by_guardian(&self, guardian: SubjectId) -> Result<Vec<ChildRecord>, MemoryError> {
    self.check()?;
    Ok(
      self
        .children
        .lock()
        .unwrap()
        .values()
        .filter(|c| c.guardians.as_ref().is_some_and(|g| g.contains(&guardian)))
        .cloned()
        .collect(),
    )
  }

  async fn children_by_school(&self, school_id: String) -> Result<Vec<ChildRecord>, MemoryError> {
    self.check()?;
    Ok(
      self
        .children
        .lock()
        .unwrap()
        .values()
        .filter(|c| c.school_id.as_deref() == Some(school_id.as_str()))
        .cloned()
        .collect(),
    )
  }

  async fn get_alert(&self, id: Uuid) -> Result<Option<AlertRecord>, MemoryError> {
    self.check()?;
    Ok(self.alerts.lock().unwrap().iter().find(|a| a.id == id).cloned())
  }

  async fn alerts_for_child(
    &self,
    child_id: Uuid,
    status: Option<AlertStatus>,
  ) -> Result<Vec<AlertRecord>, MemoryError> {
    self.check()?;
    Ok(
      self
        .alerts
        .lock()
        .unwrap()
        .iter()
        .filter(|a| a.child_id == child_id && status.is_none_or(|s| a.status == s))
        .cloned()
        .collect(),
    )
  }

  async fn list_alerts(&self, status: Option<AlertStatus>) -> Result<Vec<AlertRecord>, MemoryError> {
    self.check()?;
    Ok(
      self
        .alerts
        .lock()
        .unwrap()
        .iter()
        .filter(|a| status.is_none_or(|s| a.status == s))
        .cloned()
        .collect(),
    )
  }

  async fn insert_alert_unless_active_duplicate(
    &self,
    input: NewAlert,
  ) -> Result<AlertInsert, MemoryError> {
    self.check()?;
    let mut alerts = self.alerts.lock().unwrap();
    if let Some(existing) = alerts
      .iter()
      .find(|a| a.child_id == input.child_id && a.is_active() && a.matches_type(&input.alert_type))
    {
      return Ok(AlertInsert::Duplicate(existing.clone()));
    }
    let now = Utc::now();
    let alert = AlertRecord {
      id:                 Uuid::new_v4(),
      child_id:           input.child_id,
      status:             AlertStatus::Active,
      alert_type:         Some(input.alert_type.clone()),
      legacy_type:        Some(input.alert_type),
      description:        input.description,
      last_seen_location: input.last_seen_location,
      created_by:         input.created_by,
      created_at:         now,
      updated_at:         now,
      resolved_at:        None,
      cancelled_at:       None,
    };
    alerts.push(alert.clone());
    Ok(AlertInsert::Inserted(alert))
  }

  async fn save_alert(&self, alert: AlertRecord) -> Result<(), MemoryError> {
    self.check()?;
    let mut alerts = self.alerts.lock().unwrap();
    match alerts.iter_mut().find(|a| a.id == alert.id) {
      Some(slot) => {
        *slot = alert;
        Ok(())
      }
      None => Err(MemoryError::NoAlert(alert.id)),
    }
  }
}

impl UserDirectory for MemoryStore {
  type Error = MemoryError;

  async fn find_user_by_email(&self, email: String) -> Result<Option<UserRecord>, MemoryError> {
    self.check()?;
    Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
  }

  async fn add_user(&self, input: NewUser) -> Result<UserRecord, MemoryError> {
    self.check()?;
    let email = input.email.to_lowercase();
    if self.users.lock().unwrap().iter().any(|u| u.email == email) {
      return Err(MemoryError::EmailTaken(email));
    }
    let user = UserRecord {
      uid:          SubjectId::new(Uuid::new_v4().to_string()),
      email,
      password:     input.password,
      role:         input.role,
      is_admin:     input.is_admin,
      school_id:    input.school_id,
      display_name: input.display_name,
      created_at:   Utc::now(),
    };
    self.users.lock().unwrap().push(user.clone());
    Ok(user)
  }

  async fn list_users(&self) -> Result<Vec<UserRecord>, MemoryError> {
    self.check()?;
    Ok(self.users.lock().unwrap().clone())
  }
}

impl IdentityProvider for MemoryStore {
  type Error = MemoryError;

  async fn lookup_identity(&self, email: String) -> Result<Option<FederatedIdentity>, MemoryError> {
    self.check()?;
    Ok(
      self
        .identities
        .lock()
        .unwrap()
        .iter()
        .find(|i| i.email.eq_ignore_ascii_case(&email))
        .cloned(),
    )
  }
}
