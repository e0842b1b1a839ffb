//! Handlers for `/session`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/session` | Body: [`LoginBody`]; returns the derived principal |
//! | `GET`  | `/session` | Basic auth; returns the current principal |

use axum::extract::State;
use serde::Deserialize;
use uncip_core::principal::Principal;

use crate::{ApiState, Backend, auth::Authenticated, error::Result, extract::Json};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
  pub role:     Option<String>,
}

/// `POST /session`
pub async fn login<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Principal>> {
  let principal = state
    .verifier
    .verify(&body.email, &body.password, body.role.as_deref())
    .await?;
  Ok(Json(principal))
}

/// `GET /session`
pub async fn current(Authenticated(principal): Authenticated) -> Json<Principal> {
  Json(principal)
}
