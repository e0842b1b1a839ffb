//! HTTP Basic-auth principal extractor.
//!
//! Every authenticated route re-verifies the `Authorization` header through
//! the [`CredentialVerifier`](uncip_core::credentials::CredentialVerifier).
//! An optional `X-Uncip-Role` header carries the role requested for a
//! temporary principal.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use uncip_core::{Error, principal::Principal};

use crate::{ApiState, Backend, error::ApiError};

/// Header naming the role a demo login should assume.
pub const ROLE_HEADER: &str = "x-uncip-role";

/// The verified principal behind a request.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

/// Email, password and requested role pulled from request headers.
#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
  pub email:    String,
  pub password: String,
  pub role:     Option<String>,
}

/// Decode the Basic credentials; any malformed header is unauthenticated.
pub fn basic_credentials(headers: &HeaderMap) -> Result<BasicCredentials, Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthenticated)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthenticated)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthenticated)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthenticated)?;

  let (email, password) = creds.split_once(':').ok_or(Error::Unauthenticated)?;

  let role = headers
    .get(ROLE_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);

  Ok(BasicCredentials {
    email: email.to_owned(),
    password: password.to_owned(),
    role,
  })
}

impl<S: Backend> FromRequestParts<ApiState<S>> for Authenticated {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let creds = basic_credentials(&parts.headers)?;
    let principal = state
      .verifier
      .verify(&creds.email, &creds.password, creds.role.as_deref())
      .await?;
    Ok(Authenticated(principal))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::http::Request;
  use uncip_core::{
    access::EvaluatorPolicy,
    credentials::{CredentialConfig, hash_password},
    principal::Role,
    store::UserDirectory,
    user::NewUser,
  };
  use uncip_store_sqlite::SqliteStore;

  use super::*;

  async fn make_state() -> ApiState<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    store
      .add_user(NewUser {
        email:        "staff@school.org".into(),
        password:     Some(hash_password("secret").unwrap()),
        role:         Role::School,
        is_admin:     false,
        school_id:    Some("s1".into()),
        display_name: None,
      })
      .await
      .unwrap();

    ApiState::new(
      store,
      CredentialConfig {
        admin_email:   "admin@uncip.org".into(),
        admin_secret:  hash_password("root").unwrap(),
        demo_password: Some("demo".into()),
      },
      EvaluatorPolicy::default(),
    )
  }

  async fn extract(
    req: Request<axum::body::Body>,
    state: &ApiState<SqliteStore>,
  ) -> Result<Authenticated, ApiError> {
    let (mut parts, _) = req.into_parts();
    Authenticated::from_request_parts(&mut parts, state).await
  }

  fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  fn unauthenticated(r: Result<Authenticated, ApiError>) -> bool {
    matches!(r, Err(ApiError::Core(Error::Unauthenticated)))
  }

  #[tokio::test]
  async fn directory_user_gets_stored_role() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("Staff@School.org", "secret"))
      .body(axum::body::Body::empty()).unwrap();
    let Authenticated(p) = extract(req, &state).await.unwrap();
    assert_eq!(p.role, Role::School);
    assert_eq!(p.school_id.as_deref(), Some("s1"));
  }

  #[tokio::test]
  async fn admin_secret() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("admin@uncip.org", "root"))
      .body(axum::body::Body::empty()).unwrap();
    assert!(extract(req, &state).await.unwrap().0.is_admin());
  }

  #[tokio::test]
  async fn demo_login_honors_role_header() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("officer@police.gov", "demo"))
      .header(ROLE_HEADER, "Authority")
      .body(axum::body::Body::empty()).unwrap();
    let Authenticated(p) = extract(req, &state).await.unwrap();
    assert_eq!(p.role, Role::Authority);
    assert!(p.temporary);
  }

  #[tokio::test]
  async fn wrong_password() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("staff@school.org", "wrong"))
      .body(axum::body::Body::empty()).unwrap();
    assert!(unauthenticated(extract(req, &state).await));
  }

  #[tokio::test]
  async fn missing_header() {
    let state = make_state().await;
    let req = Request::builder().body(axum::body::Body::empty()).unwrap();
    assert!(unauthenticated(extract(req, &state).await));
  }

  #[tokio::test]
  async fn invalid_base64() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Basic !!!not-base64!!!")
      .body(axum::body::Body::empty()).unwrap();
    assert!(unauthenticated(extract(req, &state).await));
  }

  #[test]
  fn password_may_contain_colons() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, basic("a@b.c", "x:y").parse().unwrap());
    let creds = basic_credentials(&headers).unwrap();
    assert_eq!(creds.email, "a@b.c");
    assert_eq!(creds.password, "x:y");
    assert_eq!(creds.role, None);
  }
}
