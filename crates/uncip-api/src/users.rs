//! Handlers for `/users` (administrators only).

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use uncip_core::{
  principal::Role,
  user::{NewUser, UserRecord},
};

use crate::{ApiState, Backend, auth::Authenticated, error::Result, extract::Json};

/// JSON body accepted by `POST /users`. The password arrives in clear; the
/// record service stores it as an argon2 hash.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserBody {
  pub email:        String,
  pub password:     Option<String>,
  pub role:         Role,
  #[serde(default)]
  pub is_admin:     bool,
  pub school_id:    Option<String>,
  pub display_name: Option<String>,
}

/// `GET /users`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Vec<UserRecord>>> {
  Ok(Json(state.service.list_users(&principal).await?))
}

/// `POST /users`
pub async fn create<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<NewUserBody>,
) -> Result<impl IntoResponse> {
  let user = state
    .service
    .add_user(&principal, NewUser {
      email: body.email,
      password: body.password,
      role: body.role,
      is_admin: body.is_admin,
      school_id: body.school_id,
      display_name: body.display_name,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(user)))
}
