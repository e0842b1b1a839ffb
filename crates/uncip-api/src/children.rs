//! Handlers for `/children` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/children` | Children visible to the caller |
//! | `POST`   | `/children` | Body: [`NewChildBody`]; returns 201 + stored record |
//! | `GET`    | `/children/{id}` | Single record |
//! | `PUT`    | `/children/{id}` | Body: partial [`ChildUpdate`] |
//! | `DELETE` | `/children/{id}` | 204; removes the child's alerts too |
//! | `GET`    | `/children/{id}/alerts` | Optional `?status=` |
//! | `POST`   | `/children/{id}/alerts` | Body: [`AlertInput`]; 201, or 409 on a duplicate |

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use uncip_core::{
  principal::SubjectId,
  record::{AlertRecord, ChildProfile, ChildRecord, ChildUpdate, NewChild},
  service::AlertInput,
};
use uuid::Uuid;

use crate::{
  ApiState, Backend,
  alerts::StatusParams,
  auth::Authenticated,
  error::Result,
  extract::{Json, Path, Query},
};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /children`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Vec<ChildRecord>>> {
  Ok(Json(state.service.list_children(&principal).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /children`. The creator is always the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChildBody {
  pub parent_id: Option<SubjectId>,
  pub guardians: Option<Vec<SubjectId>>,
  pub school_id: Option<String>,
  pub profile:   ChildProfile,
}

/// `POST /children`
pub async fn create<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<NewChildBody>,
) -> Result<impl IntoResponse> {
  let mut input = NewChild::new(principal.subject_id.clone(), body.profile);
  input.parent_id = body.parent_id;
  input.guardians = body.guardians;
  input.school_id = body.school_id;

  let child = state.service.create_child(&principal, input).await?;
  Ok((StatusCode::CREATED, Json(child)))
}

// ─── Single record ────────────────────────────────────────────────────────────

/// `GET /children/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<ChildRecord>> {
  Ok(Json(state.service.get_child(&principal, id).await?))
}

/// `PUT /children/{id}`
pub async fn update<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<ChildUpdate>,
) -> Result<Json<ChildRecord>> {
  Ok(Json(state.service.update_child(&principal, id, body).await?))
}

/// `DELETE /children/{id}`
pub async fn delete<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode> {
  state.service.delete_child(&principal, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Alerts ───────────────────────────────────────────────────────────────────

/// `GET /children/{id}/alerts[?status=active]`
pub async fn list_alerts<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
  Query(params): Query<StatusParams>,
) -> Result<Json<Vec<AlertRecord>>> {
  let alerts = state
    .service
    .list_alerts_for_child(&principal, id, params.status)
    .await?;
  Ok(Json(alerts))
}

/// `POST /children/{id}/alerts`
pub async fn create_alert<S: Backend>(
  State(state): State<ApiState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<AlertInput>,
) -> Result<impl IntoResponse> {
  let alert = state.service.create_alert(&principal, id, body).await?;
  Ok((StatusCode::CREATED, Json(alert)))
}
