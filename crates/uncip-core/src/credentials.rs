//! Email/password verification and role derivation.
//!
//! Lookup order:
//!
//! 1. The configured administrator address authenticates against the
//!    administrator secret and is always [`Role::Admin`].
//! 2. The primary [`UserDirectory`], by lower-cased email.
//! 3. The federated [`IdentityProvider`].
//! 4. Nothing found: a temporary principal, demo bypass only.
//!
//! The demo bypass is a fixed password that unlocks any account. It exists
//! for demonstration deployments and is disabled when
//! [`CredentialConfig::demo_password`] is `None`.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;
use serde::Deserialize;

use crate::{
  Error, Result,
  principal::{Principal, Role, SubjectId},
  store::{IdentityProvider, UserDirectory},
  user::FederatedIdentity,
};

/// Subject id given to the administrator account.
pub const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
  pub admin_email:   String,
  /// Argon2 PHC string, or a plaintext secret.
  pub admin_secret:  String,
  /// Fallback password accepted for every account when set.
  #[serde(default)]
  pub demo_password: Option<String>,
}

/// Authenticates `(email, password)` pairs into [`Principal`]s.
pub struct CredentialVerifier<U, I> {
  users:      Arc<U>,
  identities: Arc<I>,
  config:     CredentialConfig,
}

impl<U, I> Clone for CredentialVerifier<U, I> {
  fn clone(&self) -> Self {
    Self {
      users:      self.users.clone(),
      identities: self.identities.clone(),
      config:     self.config.clone(),
    }
  }
}

impl<U, I> CredentialVerifier<U, I>
where
  U: UserDirectory,
  I: IdentityProvider,
{
  pub fn new(users: Arc<U>, identities: Arc<I>, config: CredentialConfig) -> Self {
    Self { users, identities, config }
  }

  /// Authenticate and derive the principal's role.
  ///
  /// Every mismatch is [`Error::Unauthenticated`]; a failing directory or
  /// provider read is [`Error::StoreUnavailable`].
  pub async fn verify(
    &self,
    email: &str,
    password: &str,
    requested_role: Option<&str>,
  ) -> Result<Principal> {
    let email = email.trim().to_lowercase();
    let is_admin_email = email == self.config.admin_email.trim().to_lowercase();

    if is_admin_email {
      if secret_matches(&self.config.admin_secret, password) {
        tracing::info!(%email, "administrator authenticated");
        return Ok(admin_principal(&email));
      }
      if self.is_demo_password(password) {
        tracing::warn!(%email, "administrator address used with demo bypass");
        let mut principal = admin_principal(&email);
        principal.temporary = true;
        return Ok(principal);
      }
      tracing::warn!(%email, "administrator secret rejected");
      return Err(Error::Unauthenticated);
    }

    if let Some(user) = self
      .users
      .find_user_by_email(email.clone())
      .await
      .map_err(Error::from_store)?
    {
      let stored_ok = user
        .password
        .as_deref()
        .is_some_and(|stored| secret_matches(stored, password));
      if !stored_ok && !self.is_demo_password(password) {
        tracing::warn!(%email, "password rejected");
        return Err(Error::Unauthenticated);
      }
      tracing::debug!(%email, role = %user.effective_role(), "user directory match");
      let mut principal = Principal::new(user.uid.clone(), user.effective_role())
        .with_email(user.email.clone());
      principal.school_id = user.school_id.clone();
      return Ok(principal);
    }

    if let Some(identity) = self
      .identities
      .lookup_identity(email.clone())
      .await
      .map_err(Error::from_store)?
    {
      if !self.is_demo_password(password) {
        tracing::warn!(%email, "federated identity requires the demo bypass");
        return Err(Error::Unauthenticated);
      }
      tracing::debug!(%email, "federated identity match");
      return Ok(federated_principal(identity));
    }

    if self.is_demo_password(password) {
      let role = parse_requested_role(requested_role);
      tracing::info!(%email, %role, "synthesized temporary principal");
      let mut principal =
        Principal::new(temporary_subject(&email), role).with_email(email);
      principal.temporary = true;
      return Ok(principal);
    }

    tracing::debug!(%email, "no account found");
    Err(Error::Unauthenticated)
  }

  fn is_demo_password(&self, password: &str) -> bool {
    self.config.demo_password.as_deref() == Some(password)
  }
}

fn admin_principal(email: &str) -> Principal {
  Principal::new(ADMIN_SUBJECT, Role::Admin).with_email(email)
}

fn federated_principal(identity: FederatedIdentity) -> Principal {
  let role = if identity.claims.admin {
    Role::Admin
  } else {
    parse_requested_role(identity.claims.role.as_deref())
  };
  let mut principal =
    Principal::new(identity.uid, role).with_email(identity.email);
  principal.school_id = identity.claims.school_id;
  principal
}

/// Unknown or missing roles fall back to [`Role::Parent`].
fn parse_requested_role(requested: Option<&str>) -> Role {
  match requested.map(str::parse::<Role>) {
    Some(Ok(role)) => role,
    Some(Err(e)) => {
      tracing::warn!(error = %e, "falling back to parent role");
      Role::Parent
    }
    None => Role::Parent,
  }
}

/// Compare a supplied password against a stored secret. PHC strings are
/// verified with argon2; anything else is a legacy plaintext secret.
pub fn secret_matches(stored: &str, supplied: &str) -> bool {
  if stored.starts_with("$argon2") {
    match PasswordHash::new(stored) {
      Ok(hash) => Argon2::default()
        .verify_password(supplied.as_bytes(), &hash)
        .is_ok(),
      Err(e) => {
        tracing::warn!(error = %e, "unparseable password hash");
        false
      }
    }
  } else {
    stored == supplied
  }
}

/// Hash `password` into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// `SubjectId` of the synthesized principal for `email`.
pub fn temporary_subject(email: &str) -> SubjectId {
  SubjectId::new(format!("temp:{}", email.trim().to_lowercase()))
}
