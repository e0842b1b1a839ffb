//! JSON REST API for UNCIP.
//!
//! Exposes an axum [`Router`] backed by any store implementing the three
//! UNCIP store traits. Every route but `POST /session` authenticates the
//! caller with HTTP Basic; TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", uncip_api::api_router(state))
//! ```

pub mod alerts;
pub mod auth;
pub mod children;
pub mod error;
pub mod extract;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use uncip_core::{
  access::EvaluatorPolicy,
  credentials::{CredentialConfig, CredentialVerifier},
  service::RecordService,
  store::{IdentityProvider, SafetyStore, UserDirectory},
};

pub use error::ApiError;

/// A store that can back the whole API.
pub trait Backend:
  SafetyStore + UserDirectory + IdentityProvider + Send + Sync + 'static
{
}

impl<T> Backend for T where
  T: SafetyStore + UserDirectory + IdentityProvider + Send + Sync + 'static
{
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub service:  RecordService<S>,
  pub verifier: CredentialVerifier<S, S>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { service: self.service.clone(), verifier: self.verifier.clone() }
  }
}

impl<S: Backend> ApiState<S> {
  pub fn new(
    store: Arc<S>,
    credentials: CredentialConfig,
    policy: EvaluatorPolicy,
  ) -> Self {
    Self {
      service:  RecordService::new(store.clone(), policy),
      verifier: CredentialVerifier::new(store.clone(), store, credentials),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(state: ApiState<S>) -> Router<()> {
  Router::new()
    // Session
    .route("/session", get(session::current).post(session::login::<S>))
    // Children
    .route("/children", get(children::list::<S>).post(children::create::<S>))
    .route(
      "/children/{id}",
      get(children::get_one::<S>)
        .put(children::update::<S>)
        .delete(children::delete::<S>),
    )
    .route(
      "/children/{id}/alerts",
      get(children::list_alerts::<S>).post(children::create_alert::<S>),
    )
    // Alerts
    .route("/alerts", get(alerts::list::<S>))
    .route("/alerts/{id}", get(alerts::get_one::<S>))
    .route("/alerts/{id}/resolve", post(alerts::resolve::<S>))
    .route("/alerts/{id}/cancel", post(alerts::cancel::<S>))
    // Users
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
