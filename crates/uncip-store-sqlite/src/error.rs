//! Error type for `uncip-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] uncip_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown alert status: {0:?}")]
  UnknownStatus(String),

  #[error("child not found: {0}")]
  ChildNotFound(uuid::Uuid),

  #[error("alert not found: {0}")]
  AlertNotFound(uuid::Uuid),

  #[error("email already registered: {0}")]
  EmailTaken(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for uncip_core::Error {
  /// Conflicts and missing rows keep their meaning; everything else is an
  /// outage of the store.
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::EmailTaken(email) => Self::UserExists(email),
      Error::ChildNotFound(id) => Self::ChildNotFound(id),
      Error::AlertNotFound(id) => Self::AlertNotFound(id),
      other => Self::store(other),
    }
  }
}
