//! Error types for `uncip-core`.
//!
//! Every authorization outcome that is not an `allow` surfaces as one of
//! these variants. `Unauthenticated` and `Forbidden` stay distinct, and a
//! failed store read is always `StoreUnavailable`, never a denial. Backends
//! map their own conflicts (a taken email, a vanished row) onto the matching
//! variant instead.

use thiserror::Error;
use uuid::Uuid;

use crate::record::AlertStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// No valid principal could be established.
  #[error("not authenticated")]
  Unauthenticated,

  /// The principal is valid but the rules deny the operation.
  #[error("forbidden")]
  Forbidden,

  #[error("child record not found: {0}")]
  ChildNotFound(Uuid),

  #[error("alert not found: {0}")]
  AlertNotFound(Uuid),

  /// An active alert of the same type already exists for the child.
  #[error("an active {alert_type:?} alert already exists for child {child_id} ({existing})")]
  DuplicateActive {
    child_id:   Uuid,
    alert_type: String,
    existing:   Uuid,
  },

  #[error("cannot move alert from {from} to {to}")]
  InvalidTransition { from: AlertStatus, to: AlertStatus },

  /// Malformed caller input.
  #[error("invalid input: {0}")]
  Invalid(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  #[error("user already exists: {0}")]
  UserExists(String),

  /// A read or write against the backing store failed; retryable.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::StoreUnavailable`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(e))
  }

  /// Convert a store trait error, keeping whatever meaning the backend
  /// attaches to it.
  pub fn from_store<E: Into<Self>>(e: E) -> Self { e.into() }

  /// Whether the caller may retry the same request unchanged.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StoreUnavailable(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
