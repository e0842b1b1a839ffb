//! HTTP server wiring for UNCIP.
//!
//! Loads [`ServerConfig`], mounts the [`uncip_api`] router under `/api` and
//! wraps it in request tracing.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uncip_api::{ApiState, Backend, api_router};
use uncip_core::{access::EvaluatorPolicy, credentials::CredentialConfig};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// under `UNCIP_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                          String,
  pub port:                          u16,
  pub store_path:                    PathBuf,
  pub admin_email:                   String,
  /// Argon2 PHC string; see `--hash-password`.
  pub admin_password_hash:           String,
  /// Enables the demo bypass when set.
  #[serde(default)]
  pub demo_password:                 Option<String>,
  #[serde(default)]
  pub alert_create_honors_parent_id: bool,
}

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "uncip.sqlite3")?
      .add_source(config::File::from(path.into()).required(false))
      .add_source(config::Environment::with_prefix("UNCIP"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// `store_path` with a leading `~/` resolved against `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf {
    home_relative(&self.store_path, std::env::var_os("HOME").map(PathBuf::from))
  }

  pub fn credentials(&self) -> CredentialConfig {
    CredentialConfig {
      admin_email:   self.admin_email.clone(),
      admin_secret:  self.admin_password_hash.clone(),
      demo_password: self.demo_password.clone(),
    }
  }

  pub fn policy(&self) -> EvaluatorPolicy {
    EvaluatorPolicy {
      alert_create_honors_parent_id: self.alert_create_honors_parent_id,
    }
  }
}

fn home_relative(path: &Path, home: Option<PathBuf>) -> PathBuf {
  match (path.strip_prefix("~"), home) {
    (Ok(rest), Some(home)) => home.join(rest),
    _ => path.to_path_buf(),
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application for `store`.
pub fn app<S: Backend>(store: Arc<S>, config: &ServerConfig) -> Router {
  let state = ApiState::new(store, config.credentials(), config.policy());
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
