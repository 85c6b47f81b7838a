//! HTTP layer for the controller shift roster.
//!
//! Exposes an axum [`Router`] with JSON endpoints for login, the shift
//! calendar and roster uploads, backed by any [`ShiftStore`].
//!
//! | Method | Path | Guard |
//! |--------|------|-------|
//! | `POST` | `/login` | none |
//! | `POST` | `/logout` | none |
//! | `GET`  | `/api/me` | session |
//! | `POST` | `/api/privacy` | session |
//! | `GET`  | `/api/shifts` | session + privacy policy |
//! | `GET`  | `/api/controllers` | admin + privacy policy |
//! | `POST` | `/upload` | admin + privacy policy |

pub mod auth;
pub mod error;
pub mod handlers;
pub mod upload;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  middleware,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use turnos_core::store::ShiftStore;

use auth::{TokenVerifier, require_privacy_policy};
use handlers::{calendar, controllers, session};

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Configuration ───────────────────────────────────────────────────────────

/// A user allowed to log in before any roster mentions them, typically the
/// first administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapUser {
  pub email: String,
  /// `"APELLIDOS NOMBRE"`, matched against roster-created records.
  pub name:  String,
  #[serde(default)]
  pub admin: bool,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `TURNOS_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  #[serde(default = "default_session_ttl_days")]
  pub session_ttl_days:  i64,
  #[serde(default)]
  pub bootstrap_users:   Vec<BootstrapUser>,
  #[serde(default)]
  pub firebase_api_key:  String,
  #[serde(default = "default_identity_endpoint")]
  pub identity_endpoint: String,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes:  usize,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("turnos.db") }
fn default_session_ttl_days() -> i64 { 90 }
fn default_identity_endpoint() -> String {
  "https://identitytoolkit.googleapis.com/v1/accounts:lookup".into()
}
fn default_max_upload_bytes() -> usize { 16 * 1024 * 1024 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              default_host(),
      port:              default_port(),
      store_path:        default_store_path(),
      session_ttl_days:  default_session_ttl_days(),
      bootstrap_users:   Vec::new(),
      firebase_api_key:  String::new(),
      identity_endpoint: default_identity_endpoint(),
      max_upload_bytes:  default_max_upload_bytes(),
    }
  }
}

impl ServerConfig {
  pub fn session_ttl(&self) -> chrono::Duration { chrono::Duration::days(self.session_ttl_days) }

  /// The configured bootstrap entry for `email`, compared case-insensitively.
  pub fn bootstrap_user(&self, email: &str) -> Option<&BootstrapUser> {
    self
      .bootstrap_users
      .iter()
      .find(|u| u.email.trim().eq_ignore_ascii_case(email.trim()))
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub verifier: Arc<dyn TokenVerifier>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      config:   Arc::clone(&self.config),
      verifier: Arc::clone(&self.verifier),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the application [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ShiftStore + 'static,
{
  let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

  let guarded = Router::new()
    .route("/api/shifts", get(calendar::list::<S>))
    .route("/api/controllers", get(controllers::list::<S>))
    .route("/upload", post(upload::handler::<S>).layer(upload_limit))
    .route_layer(middleware::from_fn_with_state(
      state.clone(),
      require_privacy_policy,
    ));

  Router::new()
    .route("/login", post(session::login::<S>))
    .route("/logout", post(session::logout::<S>))
    .route("/api/me", get(session::me))
    .route("/api/privacy", post(session::accept_privacy::<S>))
    .merge(guarded)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
