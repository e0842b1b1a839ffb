//! [`SqliteStore`]: the SQLite implementation of the UNCIP store traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use uncip_core::{
  principal::SubjectId,
  record::{AlertInsert, AlertRecord, AlertStatus, ChildRecord, NewAlert, NewChild},
  store::{IdentityProvider, SafetyStore, UserDirectory},
  user::{FederatedIdentity, NewUser, UserRecord},
};

use crate::{
  Error, Result,
  encode::{
    ALERT_COLUMNS, CHILD_COLUMNS, RawAlert, RawChild, RawIdentity, RawUser,
    USER_COLUMNS, encode_claims, encode_dt, encode_guardians, encode_profile,
    encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// What the conditional alert insert found inside its transaction.
enum InsertOutcome {
  NoChild,
  Duplicate(RawAlert),
  Inserted,
}

/// An UNCIP record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Register an identity in the local mirror of the identity provider.
  pub async fn add_identity(&self, identity: FederatedIdentity) -> Result<()> {
    let uid    = identity.uid.to_string();
    let email  = identity.email.trim().to_lowercase();
    let claims = encode_claims(&identity.claims)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identities (uid, email, claims_json) VALUES (?1, ?2, ?3)
           ON CONFLICT(uid) DO UPDATE SET email = ?2, claims_json = ?3",
          rusqlite::params![uid, email, claims],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `SELECT <children columns> FROM children <filter>` with one
  /// optional bound parameter.
  async fn query_children(
    &self,
    filter: &'static str,
    arg: Option<String>,
  ) -> Result<Vec<ChildRecord>> {
    let raws: Vec<RawChild> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHILD_COLUMNS} FROM children c {filter} ORDER BY created_at"
        ))?;
        let rows = match arg {
          Some(a) => stmt
            .query_map(rusqlite::params![a], RawChild::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawChild::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChild::into_child).collect()
  }

  async fn query_alerts(
    &self,
    child_id: Option<Uuid>,
    status: Option<AlertStatus>,
  ) -> Result<Vec<AlertRecord>> {
    let child_str  = child_id.map(encode_uuid);
    let status_str = status.map(encode_status);

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALERT_COLUMNS} FROM alerts
           WHERE (?1 IS NULL OR child_id = ?1)
             AND (?2 IS NULL OR status = ?2)
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![child_str, status_str], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }
}

// ─── SafetyStore impl ────────────────────────────────────────────────────────

impl SafetyStore for SqliteStore {
  type Error = Error;

  // ── Children ──────────────────────────────────────────────────────────────

  async fn insert_child(&self, input: NewChild) -> Result<ChildRecord> {
    let now = Utc::now();
    let child = ChildRecord {
      id:         Uuid::new_v4(),
      parent_id:  input.parent_id,
      guardians:  input.guardians,
      school_id:  input.school_id,
      profile:    input.profile,
      created_by: input.created_by,
      created_at: now,
      updated_at: now,
    };

    let id_str        = encode_uuid(child.id);
    let parent_id     = child.parent_id.as_ref().map(SubjectId::to_string);
    let guardians_str = encode_guardians(child.guardians.as_deref())?;
    let school_id     = child.school_id.clone();
    let profile_str   = encode_profile(&child.profile)?;
    let created_by    = child.created_by.to_string();
    let at_str        = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO children (
             child_id, parent_id, guardians, school_id,
             profile_json, created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            id_str,
            parent_id,
            guardians_str,
            school_id,
            profile_str,
            created_by,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(child)
  }

  async fn get_child(&self, id: Uuid) -> Result<Option<ChildRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawChild> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CHILD_COLUMNS} FROM children WHERE child_id = ?1"),
            rusqlite::params![id_str],
            RawChild::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawChild::into_child).transpose()
  }

  async fn save_child(&self, record: ChildRecord) -> Result<()> {
    let id            = record.id;
    let id_str        = encode_uuid(id);
    let parent_id     = record.parent_id.as_ref().map(SubjectId::to_string);
    let guardians_str = encode_guardians(record.guardians.as_deref())?;
    let school_id     = record.school_id;
    let profile_str   = encode_profile(&record.profile)?;
    let updated_str   = encode_dt(record.updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE children
             SET parent_id = ?2, guardians = ?3, school_id = ?4,
                 profile_json = ?5, updated_at = ?6
           WHERE child_id = ?1",
          rusqlite::params![
            id_str,
            parent_id,
            guardians_str,
            school_id,
            profile_str,
            updated_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::ChildNotFound(id));
    }
    Ok(())
  }

  async fn delete_child(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    // Alerts go with the child via ON DELETE CASCADE.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM children WHERE child_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn list_children(&self) -> Result<Vec<ChildRecord>> {
    self.query_children("", None).await
  }

  async fn children_by_parent(&self, parent: SubjectId) -> Result<Vec<ChildRecord>> {
    self
      .query_children("WHERE c.parent_id = ?1", Some(parent.to_string()))
      .await
  }

  async fn children_by_guardian(&self, guardian: SubjectId) -> Result<Vec<ChildRecord>> {
    self
      .query_children(
        "WHERE c.guardians IS NOT NULL
           AND EXISTS (SELECT 1 FROM json_each(c.guardians) g WHERE g.value = ?1)",
        Some(guardian.to_string()),
      )
      .await
  }

  async fn children_by_school(&self, school_id: String) -> Result<Vec<ChildRecord>> {
    self
      .query_children("WHERE c.school_id = ?1", Some(school_id))
      .await
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn get_alert(&self, id: Uuid) -> Result<Option<AlertRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE alert_id = ?1"),
            rusqlite::params![id_str],
            RawAlert::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn alerts_for_child(
    &self,
    child_id: Uuid,
    status: Option<AlertStatus>,
  ) -> Result<Vec<AlertRecord>> {
    self.query_alerts(Some(child_id), status).await
  }

  async fn list_alerts(&self, status: Option<AlertStatus>) -> Result<Vec<AlertRecord>> {
    self.query_alerts(None, status).await
  }

  async fn insert_alert_unless_active_duplicate(
    &self,
    input: NewAlert,
  ) -> Result<AlertInsert> {
    let now = Utc::now();
    let alert = AlertRecord {
      id:                 Uuid::new_v4(),
      child_id:           input.child_id,
      status:             AlertStatus::Active,
      alert_type:         Some(input.alert_type.clone()),
      legacy_type:        Some(input.alert_type.clone()),
      description:        input.description,
      last_seen_location: input.last_seen_location,
      created_by:         input.created_by,
      created_at:         now,
      updated_at:         now,
      resolved_at:        None,
      cancelled_at:       None,
    };

    let id_str      = encode_uuid(alert.id);
    let child_str   = encode_uuid(alert.child_id);
    let alert_type  = input.alert_type;
    let description = alert.description.clone();
    let location    = alert.last_seen_location.clone();
    let created_by  = alert.created_by.clone();
    let at_str      = encode_dt(now);

    // The scan and the insert share one IMMEDIATE transaction, which takes
    // the write lock up front; a concurrent create for the same child waits
    // and then sees this row.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let child_exists = tx
          .query_row(
            "SELECT 1 FROM children WHERE child_id = ?1",
            [&child_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !child_exists {
          return Ok(InsertOutcome::NoChild);
        }

        let existing = tx
          .query_row(
            &format!(
              "SELECT {ALERT_COLUMNS} FROM alerts
               WHERE child_id = ?1
                 AND status = 'active'
                 AND (alert_type = ?2 OR type = ?2)
               ORDER BY created_at
               LIMIT 1"
            ),
            rusqlite::params![child_str, alert_type],
            RawAlert::from_row,
          )
          .optional()?;
        if let Some(raw) = existing {
          return Ok(InsertOutcome::Duplicate(raw));
        }

        tx.execute(
          "INSERT INTO alerts (
             alert_id, child_id, status, alert_type, type,
             description, last_seen_location, created_by, created_at, updated_at
           ) VALUES (?1, ?2, 'active', ?3, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            id_str,
            child_str,
            alert_type,
            description,
            location,
            created_by,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(InsertOutcome::Inserted)
      })
      .await?;

    match outcome {
      InsertOutcome::NoChild => Err(Error::ChildNotFound(alert.child_id)),
      InsertOutcome::Duplicate(raw) => Ok(AlertInsert::Duplicate(raw.into_alert()?)),
      InsertOutcome::Inserted => Ok(AlertInsert::Inserted(alert)),
    }
  }

  async fn save_alert(&self, alert: AlertRecord) -> Result<()> {
    let id           = alert.id;
    let id_str       = encode_uuid(id);
    let status_str   = encode_status(alert.status);
    let updated_str  = encode_dt(alert.updated_at);
    let resolved_str = alert.resolved_at.map(encode_dt);
    let cancel_str   = alert.cancelled_at.map(encode_dt);
    let description  = alert.description;
    let location     = alert.last_seen_location;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE alerts
             SET status = ?2, description = ?3, last_seen_location = ?4,
                 updated_at = ?5, resolved_at = ?6, cancelled_at = ?7
           WHERE alert_id = ?1",
          rusqlite::params![
            id_str,
            status_str,
            description,
            location,
            updated_str,
            resolved_str,
            cancel_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::AlertNotFound(id));
    }
    Ok(())
  }
}

// ─── UserDirectory impl ──────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = Error;

  async fn find_user_by_email(&self, email: String) -> Result<Option<UserRecord>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn add_user(&self, input: NewUser) -> Result<UserRecord> {
    let user = UserRecord {
      uid:          SubjectId::new(Uuid::new_v4().to_string()),
      email:        input.email.trim().to_lowercase(),
      password:     input.password,
      role:         input.role,
      is_admin:     input.is_admin,
      school_id:    input.school_id,
      display_name: input.display_name,
      created_at:   Utc::now(),
    };

    let uid          = user.uid.to_string();
    let email        = user.email.clone();
    let password     = user.password.clone();
    let role         = user.role.as_str();
    let is_admin     = user.is_admin;
    let school_id    = user.school_id.clone();
    let display_name = user.display_name.clone();
    let at_str       = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO users (
             uid, email, password, role, is_admin, school_id, display_name, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            uid,
            email,
            password,
            role,
            is_admin,
            school_id,
            display_name,
            at_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::EmailTaken(user.email));
    }
    Ok(user)
  }

  async fn list_users(&self) -> Result<Vec<UserRecord>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }
}

// ─── IdentityProvider impl ───────────────────────────────────────────────────

impl IdentityProvider for SqliteStore {
  type Error = Error;

  async fn lookup_identity(&self, email: String) -> Result<Option<FederatedIdentity>> {
    let email = email.trim().to_lowercase();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT uid, email, claims_json FROM identities WHERE email = ?1",
            rusqlite::params![email],
            |row| {
              Ok(RawIdentity {
                uid:         row.get(0)?,
                email:       row.get(1)?,
                claims_json: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }
}
