//! Stored user accounts and federated identities consulted at login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::{Role, SubjectId};

/// An account in the primary user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
  pub uid:          SubjectId,
  /// Always stored lower-cased.
  pub email:        String,
  /// Argon2 PHC string, or a plaintext secret on legacy accounts.
  #[serde(skip_serializing, default)]
  pub password:     Option<String>,
  pub role:         Role,
  /// Overrides `role` when set.
  #[serde(default)]
  pub is_admin:     bool,
  pub school_id:    Option<String>,
  pub display_name: Option<String>,
  pub created_at:   DateTime<Utc>,
}

impl UserRecord {
  pub fn effective_role(&self) -> Role {
    if self.is_admin { Role::Admin } else { self.role }
  }
}

/// Input to [`crate::store::UserDirectory::add_user`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
  pub email:        String,
  /// Plaintext when passed to [`crate::service::RecordService::add_user`],
  /// which hashes it; a stored secret when passed to the store directly.
  pub password:     Option<String>,
  pub role:         Role,
  #[serde(default)]
  pub is_admin:     bool,
  pub school_id:    Option<String>,
  pub display_name: Option<String>,
}

/// Custom attributes attached to a federated identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
  pub role:      Option<String>,
  #[serde(default)]
  pub admin:     bool,
  pub school_id: Option<String>,
}

/// An identity known to the external identity provider but absent from the
/// primary user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedIdentity {
  pub uid:    SubjectId,
  pub email:  String,
  pub claims: IdentityClaims,
}
