//! Login plumbing: identity-token verification, the session cookie and the
//! request guards built on it.

use std::{future::Future, pin::Pin};

use axum::{
  extract::{FromRequestParts, Request},
  http::{HeaderMap, HeaderValue, header, request::Parts},
  middleware::Next,
  response::Response,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;
use turnos_core::{controller::Controller, store::ShiftStore};

use crate::{AppState, error::Error};

// ─── Token verification ──────────────────────────────────────────────────────

/// The account behind a verified identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
  pub uid:   String,
  pub email: String,
}

pub type VerifyFuture<'a> =
  Pin<Box<dyn Future<Output = Result<VerifiedIdentity, Error>> + Send + 'a>>;

/// Checks an identity token issued to the browser by the sign-in widget.
///
/// Object-safe so the server can hold an `Arc<dyn TokenVerifier>` and tests
/// can substitute a stub.
pub trait TokenVerifier: Send + Sync {
  fn verify<'a>(&'a self, id_token: &'a str) -> VerifyFuture<'a>;
}

/// Verifies tokens with the Identity Toolkit `accounts:lookup` endpoint.
pub struct IdentityToolkitVerifier {
  client:   reqwest::Client,
  endpoint: String,
  api_key:  String,
}

impl IdentityToolkitVerifier {
  pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      client:   reqwest::Client::new(),
      endpoint: endpoint.into(),
      api_key:  api_key.into(),
    }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
  local_id: String,
  email:    Option<String>,
  #[serde(default)]
  disabled: bool,
}

#[derive(Deserialize)]
struct LookupResponse {
  #[serde(default)]
  users: Vec<LookupUser>,
}

impl TokenVerifier for IdentityToolkitVerifier {
  fn verify<'a>(&'a self, id_token: &'a str) -> VerifyFuture<'a> {
    Box::pin(async move {
      let response = self
        .client
        .post(&self.endpoint)
        .query(&[("key", self.api_key.as_str())])
        .json(&json!({ "idToken": id_token }))
        .send()
        .await
        .map_err(|e| Error::IdentityProvider(e.to_string()))?;

      // 400 means the token itself was rejected.
      if response.status().is_client_error() {
        return Err(Error::InvalidToken("token rechazado".into()));
      }

      let body: LookupResponse = response
        .error_for_status()
        .map_err(|e| Error::IdentityProvider(e.to_string()))?
        .json()
        .await
        .map_err(|e| Error::IdentityProvider(e.to_string()))?;

      let user = body
        .users
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidToken("cuenta desconocida".into()))?;
      if user.disabled {
        return Err(Error::InvalidToken("cuenta deshabilitada".into()));
      }
      let email = user
        .email
        .ok_or_else(|| Error::InvalidToken("la cuenta no tiene e-mail".into()))?;

      Ok(VerifiedIdentity { uid: user.local_id, email })
    })
  }
}

// ─── Session cookie ──────────────────────────────────────────────────────────

pub const SESSION_COOKIE: &str = "turnos_session";

/// `Set-Cookie` value for a freshly created session.
pub fn session_cookie(token: &str, ttl: Duration) -> Result<HeaderValue, Error> {
  cookie_header(token, ttl.num_seconds().max(0))
}

/// `Set-Cookie` value that makes the browser drop the session.
pub fn clear_session_cookie() -> Result<HeaderValue, Error> { cookie_header("", 0) }

fn cookie_header(value: &str, max_age: i64) -> Result<HeaderValue, Error> {
  HeaderValue::try_from(format!(
    "{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}"
  ))
  .map_err(|e| Error::Internal(e.to_string()))
}

/// The session token carried in the request's `Cookie` headers, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
    .map(|(_, value)| value)
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The controller owning the request's session. Rejects with 401 otherwise.
///
/// The resolved record is cached in the request extensions, so the privacy
/// middleware and the handler behind it share one lookup.
pub struct CurrentController(pub Controller);

impl<S> FromRequestParts<AppState<S>> for CurrentController
where
  S: ShiftStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    if let Some(controller) = parts.extensions.get::<Controller>() {
      return Ok(Self(controller.clone()));
    }

    let token = session_token(&parts.headers).ok_or(Error::Unauthorized)?;
    let controller = state
      .store
      .session_controller(token)
      .await
      .map_err(Error::store)?
      .ok_or(Error::Unauthorized)?;

    parts.extensions.insert(controller.clone());
    Ok(Self(controller))
  }
}

/// Like [`CurrentController`], but only for administrators (403 otherwise).
pub struct AdminController(pub Controller);

impl<S> FromRequestParts<AppState<S>> for AdminController
where
  S: ShiftStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentController(controller) =
      CurrentController::from_request_parts(parts, state).await?;
    if !controller.is_admin {
      return Err(Error::Forbidden);
    }
    Ok(Self(controller))
  }
}

// ─── Privacy policy gate ─────────────────────────────────────────────────────

/// Middleware: the wrapped routes are only served to logged-in controllers
/// who have accepted the privacy policy.
pub async fn require_privacy_policy(
  CurrentController(controller): CurrentController,
  request: Request,
  next: Next,
) -> Result<Response, Error> {
  if !controller.privacy_accepted {
    return Err(Error::PrivacyPolicyPending);
  }
  Ok(next.run(request).await)
}
