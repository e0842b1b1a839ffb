//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] uncip_core::Error),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    use uncip_core::Error as E;
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(e) => match e {
        E::Unauthenticated => StatusCode::UNAUTHORIZED,
        E::Forbidden => StatusCode::FORBIDDEN,
        E::ChildNotFound(_) | E::AlertNotFound(_) => StatusCode::NOT_FOUND,
        E::DuplicateActive { .. } | E::InvalidTransition { .. } | E::UserExists(_) => {
          StatusCode::CONFLICT
        }
        E::Invalid(_) | E::UnknownRole(_) => StatusCode::BAD_REQUEST,
        E::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        E::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      ApiError::Core(uncip_core::Error::DuplicateActive { existing, .. }) => {
        json!({ "error": self.to_string(), "existing": existing })
      }
      ApiError::Core(e @ uncip_core::Error::StoreUnavailable(_)) => {
        tracing::error!(error = %e, "store unavailable");
        json!({ "error": "store unavailable", "retryable": true })
      }
      _ => json!({ "error": self.to_string() }),
    };

    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"uncip\""),
      );
    }
    res
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
