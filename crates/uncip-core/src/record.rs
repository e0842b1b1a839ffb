//! Child and alert records, the two kinds of document access control is
//! evaluated against.
//!
//! Child ownership is encoded twice. The legacy model is the `guardians`
//! array; the current model is the `parent_id` scalar. Neither is guaranteed
//! to be populated and they may diverge, so every ownership check goes
//! through [`Ownership`].

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::principal::SubjectId;

// ─── Ownership ───────────────────────────────────────────────────────────────

/// The owner set of a child record, merged from both encodings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
  /// From `parent_id`.
  pub primary: Option<SubjectId>,
  /// From `guardians`, duplicates collapsed.
  pub members: BTreeSet<SubjectId>,
}

impl Ownership {
  pub fn new(
    primary: Option<&SubjectId>,
    members: Option<&[SubjectId]>,
  ) -> Self {
    Self {
      primary: primary.cloned(),
      members: members.unwrap_or_default().iter().cloned().collect(),
    }
  }

  /// True if `subject` owns the record under either encoding.
  pub fn contains(&self, subject: &SubjectId) -> bool {
    self.primary.as_ref() == Some(subject) || self.members.contains(subject)
  }

  /// True if `subject` is listed in the legacy `guardians` array.
  pub fn has_member(&self, subject: &SubjectId) -> bool {
    self.members.contains(subject)
  }

  pub fn is_empty(&self) -> bool {
    self.primary.is_none() && self.members.is_empty()
  }
}

/// Add `subject` to a guardians array, creating it if absent. Existing
/// duplicates are collapsed; first-seen order is kept.
pub fn add_guardian(
  guardians: &mut Option<Vec<SubjectId>>,
  subject: &SubjectId,
) {
  let list = guardians.get_or_insert_with(Vec::new);
  list.push(subject.clone());
  let mut seen = BTreeSet::new();
  list.retain(|g| seen.insert(g.clone()));
}

// ─── Child ───────────────────────────────────────────────────────────────────

/// Descriptive fields of a child profile. None of these participate in
/// access control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
  pub full_name:         String,
  pub date_of_birth:     Option<NaiveDate>,
  pub gender:            Option<String>,
  /// Height, hair and eye colour, distinguishing marks.
  pub description:       Option<String>,
  pub medical_notes:     Option<String>,
  pub photo_url:         Option<String>,
  pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRecord {
  pub id:         Uuid,
  pub parent_id:  Option<SubjectId>,
  pub guardians:  Option<Vec<SubjectId>>,
  pub school_id:  Option<String>,
  pub profile:    ChildProfile,
  pub created_by: SubjectId,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ChildRecord {
  pub fn ownership(&self) -> Ownership {
    Ownership::new(self.parent_id.as_ref(), self.guardians.as_deref())
  }
}

/// Input to [`crate::store::SafetyStore::insert_child`]. The id and
/// timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChild {
  pub parent_id:  Option<SubjectId>,
  pub guardians:  Option<Vec<SubjectId>>,
  pub school_id:  Option<String>,
  pub profile:    ChildProfile,
  pub created_by: SubjectId,
}

impl NewChild {
  pub fn new(created_by: impl Into<SubjectId>, profile: ChildProfile) -> Self {
    Self {
      parent_id: None,
      guardians: None,
      school_id: None,
      profile,
      created_by: created_by.into(),
    }
  }

  pub fn ownership(&self) -> Ownership {
    Ownership::new(self.parent_id.as_ref(), self.guardians.as_deref())
  }
}

/// A partial update to a child record. An absent field is left untouched;
/// for the optional fields an explicit `null` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildUpdate {
  pub profile:   Option<ChildProfile>,
  #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub school_id: Option<Option<String>>,
  #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<Option<SubjectId>>,
  #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub guardians: Option<Option<Vec<SubjectId>>>,
}

/// Only called for keys present in the input, so `null` becomes `Some(None)`.
fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}

impl ChildUpdate {
  /// Whether the update touches either ownership encoding.
  pub fn touches_ownership(&self) -> bool {
    self.parent_id.is_some() || self.guardians.is_some()
  }

  pub fn apply_to(self, record: &mut ChildRecord, at: DateTime<Utc>) {
    if let Some(profile) = self.profile {
      record.profile = profile;
    }
    if let Some(school_id) = self.school_id {
      record.school_id = school_id;
    }
    if let Some(parent_id) = self.parent_id {
      record.parent_id = parent_id;
    }
    if let Some(guardians) = self.guardians {
      record.guardians = guardians;
    }
    record.updated_at = at;
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
  Active,
  Resolved,
  Cancelled,
}

impl AlertStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Resolved => "resolved",
      Self::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::Active) }
}

impl fmt::Display for AlertStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A safety alert about exactly one child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
  pub id:                 Uuid,
  pub child_id:           Uuid,
  pub status:             AlertStatus,
  pub alert_type:         Option<String>,
  /// Legacy duplicate of `alert_type`; older writers only set this one.
  #[serde(rename = "type")]
  pub legacy_type:        Option<String>,
  pub description:        Option<String>,
  pub last_seen_location: Option<String>,
  /// Subject id of the creator, or a bare role tag on legacy records.
  pub created_by:         String,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
  pub resolved_at:        Option<DateTime<Utc>>,
  pub cancelled_at:       Option<DateTime<Utc>>,
}

impl AlertRecord {
  /// True if either category field equals `alert_type`.
  pub fn matches_type(&self, alert_type: &str) -> bool {
    self.alert_type.as_deref() == Some(alert_type)
      || self.legacy_type.as_deref() == Some(alert_type)
  }

  /// The alert's category, preferring the current field.
  pub fn category(&self) -> Option<&str> {
    self.alert_type.as_deref().or(self.legacy_type.as_deref())
  }

  pub fn is_active(&self) -> bool { self.status == AlertStatus::Active }
}

/// Input to [`crate::store::SafetyStore::insert_alert_unless_active_duplicate`].
/// The store writes `alert_type` into both category fields and sets the
/// status to [`AlertStatus::Active`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
  pub child_id:           Uuid,
  pub alert_type:         String,
  pub description:        Option<String>,
  pub last_seen_location: Option<String>,
  pub created_by:         String,
}

/// Outcome of a conditional alert insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertInsert {
  Inserted(AlertRecord),
  /// An active alert with the same type already existed; nothing written.
  Duplicate(AlertRecord),
}
