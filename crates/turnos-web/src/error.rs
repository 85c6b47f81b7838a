//! Error types and axum `IntoResponse` implementation.
//!
//! Messages shown to users are in Spanish, as the rest of the application.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Sesión no iniciada")]
  Unauthorized,

  #[error("Acceso restringido a administradores")]
  Forbidden,

  #[error("Debe aceptar la política de privacidad")]
  PrivacyPolicyPending,

  #[error("Usuario no reconocido. Hable con el administrador.")]
  UnknownUser,

  #[error("Inicio de sesión fallido: {0}")]
  InvalidToken(String),

  #[error("identity provider error: {0}")]
  IdentityProvider(String),

  #[error("No se ha seleccionado un archivo")]
  NoFile,

  #[error("Formato de archivo no válido: {0}")]
  InvalidFormat(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("Error de base de datos")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::Unauthorized | Error::InvalidToken(_) => StatusCode::UNAUTHORIZED,
      Error::Forbidden | Error::PrivacyPolicyPending | Error::UnknownUser => {
        StatusCode::FORBIDDEN
      }
      Error::NoFile | Error::InvalidFormat(_) | Error::BadRequest(_) => {
        StatusCode::BAD_REQUEST
      }
      Error::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
      Error::Internal(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<turnos_roster::Error> for Error {
  fn from(e: turnos_roster::Error) -> Self {
    match e {
      turnos_roster::Error::InvalidFormat(msg) => Error::InvalidFormat(msg),
      other => Error::InvalidFormat(other.to_string()),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    match &self {
      Error::Store(e) => tracing::error!(error = %e, "store failure"),
      Error::Internal(_) | Error::IdentityProvider(_) => {
        tracing::error!(error = %self, "request failed");
      }
      _ => tracing::debug!(error = %self, %status, "request rejected"),
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
