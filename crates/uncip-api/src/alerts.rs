//! Handlers for `/alerts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/alerts` | Optional `?status=active\|resolved\|cancelled` |
//! | `GET`  | `/alerts/{id}` | Single alert |
//! | `POST` | `/alerts/{id}/resolve` | `active` → `resolved` |
//! | `POST` | `/alerts/{id}/cancel` | `active` → `cancelled` |

use axum::extract::State;
use serde::Deserialize;
use uncip_core::record::{AlertRecord, AlertStatus};
use uuid::Uuid;

use crate::{
  ApiState, Backend,
  auth::Authenticated,
  error::Result,
  extract::{Json, Path, Query},
};

#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
  pub status: Option<AlertStatus>,
}

/// `GET /alerts[?status=...]`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Query(params): Query<StatusParams>,
) -> Result<Json<Vec<AlertRecord>>> {
  Ok(Json(state.service.list_alerts(&principal, params.status).await?))
}

/// `GET /alerts/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertRecord>> {
  Ok(Json(state.service.get_alert(&principal, id).await?))
}

/// `POST /alerts/{id}/resolve`
pub async fn resolve<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertRecord>> {
  Ok(Json(state.service.resolve_alert(&principal, id).await?))
}

/// `POST /alerts/{id}/cancel`
pub async fn cancel<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertRecord>> {
  Ok(Json(state.service.cancel_alert(&principal, id).await?))
}
