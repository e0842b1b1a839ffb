//! Principal: the authenticated identity making a request.
//!
//! A principal is produced once per request by the session layer and passed
//! down unchanged. Business logic never re-derives a role from raw session
//! payloads.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque identifier of an authenticated subject (a user uid, a federated
/// identity uid, or a synthesized temporary id).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SubjectId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for SubjectId {
  fn from(s: String) -> Self { Self(s) }
}

/// The dashboard role a principal acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Parent,
  School,
  Authority,
  Community,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Parent => "parent",
      Self::School => "school",
      Self::Authority => "authority",
      Self::Community => "community",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = Error;

  /// Case-insensitive; surrounding whitespace is ignored.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "admin" => Ok(Self::Admin),
      "parent" => Ok(Self::Parent),
      "school" => Ok(Self::School),
      "authority" => Ok(Self::Authority),
      "community" => Ok(Self::Community),
      _ => Err(Error::UnknownRole(s.to_owned())),
    }
  }
}

/// An authenticated subject together with its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
  pub subject_id: SubjectId,
  pub role:       Role,
  /// Only meaningful for [`Role::School`].
  pub school_id:  Option<String>,
  pub email:      Option<String>,
  /// Set when the principal was synthesized without any stored record.
  #[serde(default)]
  pub temporary:  bool,
}

impl Principal {
  pub fn new(subject_id: impl Into<SubjectId>, role: Role) -> Self {
    Self {
      subject_id: subject_id.into(),
      role,
      school_id: None,
      email: None,
      temporary: false,
    }
  }

  pub fn with_school(mut self, school_id: impl Into<String>) -> Self {
    self.school_id = Some(school_id.into());
    self
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }

  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}
