//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields (child
//! profiles, guardian arrays, identity claims) are stored as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use uncip_core::{
  principal::{Role, SubjectId},
  record::{AlertRecord, AlertStatus, ChildProfile, ChildRecord},
  user::{FederatedIdentity, IdentityClaims, UserRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── AlertStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(s: AlertStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<AlertStatus> {
  match s {
    "active" => Ok(AlertStatus::Active),
    "resolved" => Ok(AlertStatus::Resolved),
    "cancelled" => Ok(AlertStatus::Cancelled),
    other => Err(Error::UnknownStatus(other.to_owned())),
  }
}

// ─── Guardians ────────────────────────────────────────────────────────────────

/// `None` stays SQL NULL so an absent legacy array is distinguishable from
/// an empty one.
pub fn encode_guardians(g: Option<&[SubjectId]>) -> Result<Option<String>> {
  Ok(g.map(serde_json::to_string).transpose()?)
}

pub fn decode_guardians(s: Option<&str>) -> Result<Option<Vec<SubjectId>>> {
  Ok(s.map(serde_json::from_str::<Vec<SubjectId>>).transpose()?)
}

// ─── Profile / claims ─────────────────────────────────────────────────────────

pub fn encode_profile(p: &ChildProfile) -> Result<String> {
  Ok(serde_json::to_string(p)?)
}

pub fn encode_claims(c: &IdentityClaims) -> Result<String> {
  Ok(serde_json::to_string(c)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const CHILD_COLUMNS: &str = "child_id, parent_id, guardians, school_id, \
   profile_json, created_by, created_at, updated_at";

/// Raw strings read directly from a `children` row.
pub struct RawChild {
  pub child_id:     String,
  pub parent_id:    Option<String>,
  pub guardians:    Option<String>,
  pub school_id:    Option<String>,
  pub profile_json: String,
  pub created_by:   String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawChild {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      child_id:     row.get(0)?,
      parent_id:    row.get(1)?,
      guardians:    row.get(2)?,
      school_id:    row.get(3)?,
      profile_json: row.get(4)?,
      created_by:   row.get(5)?,
      created_at:   row.get(6)?,
      updated_at:   row.get(7)?,
    })
  }

  pub fn into_child(self) -> Result<ChildRecord> {
    Ok(ChildRecord {
      id:         decode_uuid(&self.child_id)?,
      parent_id:  self.parent_id.map(SubjectId::from),
      guardians:  decode_guardians(self.guardians.as_deref())?,
      school_id:  self.school_id,
      profile:    serde_json::from_str(&self.profile_json)?,
      created_by: SubjectId::from(self.created_by),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const ALERT_COLUMNS: &str = "alert_id, child_id, status, alert_type, type, \
   description, last_seen_location, created_by, created_at, updated_at, \
   resolved_at, cancelled_at";

/// Raw strings read directly from an `alerts` row.
pub struct RawAlert {
  pub alert_id:           String,
  pub child_id:           String,
  pub status:             String,
  pub alert_type:         Option<String>,
  pub legacy_type:        Option<String>,
  pub description:        Option<String>,
  pub last_seen_location: Option<String>,
  pub created_by:         String,
  pub created_at:         String,
  pub updated_at:         String,
  pub resolved_at:        Option<String>,
  pub cancelled_at:       Option<String>,
}

impl RawAlert {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:           row.get(0)?,
      child_id:           row.get(1)?,
      status:             row.get(2)?,
      alert_type:         row.get(3)?,
      legacy_type:        row.get(4)?,
      description:        row.get(5)?,
      last_seen_location: row.get(6)?,
      created_by:         row.get(7)?,
      created_at:         row.get(8)?,
      updated_at:         row.get(9)?,
      resolved_at:        row.get(10)?,
      cancelled_at:       row.get(11)?,
    })
  }

  pub fn into_alert(self) -> Result<AlertRecord> {
    Ok(AlertRecord {
      id:                 decode_uuid(&self.alert_id)?,
      child_id:           decode_uuid(&self.child_id)?,
      status:             decode_status(&self.status)?,
      alert_type:         self.alert_type,
      legacy_type:        self.legacy_type,
      description:        self.description,
      last_seen_location: self.last_seen_location,
      created_by:         self.created_by,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
      resolved_at:        decode_opt_dt(self.resolved_at)?,
      cancelled_at:       decode_opt_dt(self.cancelled_at)?,
    })
  }
}

pub const USER_COLUMNS: &str =
  "uid, email, password, role, is_admin, school_id, display_name, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub uid:          String,
  pub email:        String,
  pub password:     Option<String>,
  pub role:         String,
  pub is_admin:     bool,
  pub school_id:    Option<String>,
  pub display_name: Option<String>,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:          row.get(0)?,
      email:        row.get(1)?,
      password:     row.get(2)?,
      role:         row.get(3)?,
      is_admin:     row.get(4)?,
      school_id:    row.get(5)?,
      display_name: row.get(6)?,
      created_at:   row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<UserRecord> {
    Ok(UserRecord {
      uid:          SubjectId::from(self.uid),
      email:        self.email,
      password:     self.password,
      role:         self.role.parse::<Role>()?,
      is_admin:     self.is_admin,
      school_id:    self.school_id,
      display_name: self.display_name,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub uid:         String,
  pub email:       String,
  pub claims_json: String,
}

impl RawIdentity {
  pub fn into_identity(self) -> Result<FederatedIdentity> {
    Ok(FederatedIdentity {
      uid:    SubjectId::from(self.uid),
      email:  self.email,
      claims: serde_json::from_str(&self.claims_json)?,
    })
  }
}
