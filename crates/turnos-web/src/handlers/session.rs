//! Login, logout and the logged-in controller's own record.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/login` | form or JSON `idToken`; sets the session cookie |
//! | `POST` | `/logout` | deletes the session, clears the cookie |
//! | `GET`  | `/api/me` | current controller |
//! | `POST` | `/api/privacy` | accept the privacy policy |

use axum::{
  Form, Json,
  extract::{FromRequest, Request, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use turnos_core::{controller::Controller, store::ShiftStore};

use crate::{
  AppState, Result,
  auth::{CurrentController, clear_session_cookie, session_cookie, session_token},
  error::Error,
};

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LoginBody {
  #[serde(rename = "idToken")]
  id_token: String,
}

/// The identity token posted by the sign-in page, as a urlencoded form field
/// or a JSON body.
pub struct IdToken(pub String);

impl<S> FromRequest<S> for IdToken
where
  S: Send + Sync,
{
  type Rejection = Error;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let is_json = req
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|ct| ct.starts_with("application/json"));

    let body = if is_json {
      Json::<LoginBody>::from_request(req, state)
        .await
        .map_err(|e| Error::BadRequest(e.body_text()))?
        .0
    } else {
      Form::<LoginBody>::from_request(req, state)
        .await
        .map_err(|e| Error::BadRequest(e.body_text()))?
        .0
    };
    Ok(Self(body.id_token))
  }
}

/// Find the controller for a verified e-mail, bootstrapping configured users
/// on their first login.
async fn resolve_login<S>(state: &AppState<S>, email: &str) -> Result<Controller>
where
  S: ShiftStore + 'static,
{
  let existing = state
    .store
    .find_controller_by_email(email)
    .await
    .map_err(Error::store)?;

  match (existing, state.config.bootstrap_user(email)) {
    (Some(controller), Some(user)) if user.admin && !controller.is_admin => state
      .store
      .bootstrap_controller(controller.name_key, controller.email, true)
      .await
      .map_err(Error::store),
    (Some(controller), _) => Ok(controller),
    (None, Some(user)) => state
      .store
      .bootstrap_controller(user.name.clone(), email.trim().to_owned(), user.admin)
      .await
      .map_err(Error::store),
    (None, None) => Err(Error::UnknownUser),
  }
}

/// `POST /login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  IdToken(id_token): IdToken,
) -> Result<impl IntoResponse>
where
  S: ShiftStore + 'static,
{
  let identity = state.verifier.verify(&id_token).await?;
  let mut controller = resolve_login(&state, &identity.email).await?;

  if controller.firebase_uid.as_deref() != Some(identity.uid.as_str()) {
    state
      .store
      .link_firebase_uid(controller.id, identity.uid.clone())
      .await
      .map_err(Error::store)?;
    controller.firebase_uid = Some(identity.uid);
  }

  let ttl = state.config.session_ttl();
  let session = state
    .store
    .create_session(controller.id, ttl)
    .await
    .map_err(Error::store)?;

  info!(id = controller.id, email = %controller.email, admin = controller.is_admin, "login");
  Ok(([(header::SET_COOKIE, session_cookie(&session.token, ttl)?)], Json(controller)))
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<impl IntoResponse>
where
  S: ShiftStore + 'static,
{
  if let Some(token) = session_token(&headers) {
    state.store.delete_session(token).await.map_err(Error::store)?;
  }
  Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear_session_cookie()?)]))
}

// ─── Current controller ──────────────────────────────────────────────────────

/// `GET /api/me`
pub async fn me(CurrentController(controller): CurrentController) -> Json<Controller> {
  Json(controller)
}

/// `POST /api/privacy`
pub async fn accept_privacy<S>(
  State(state): State<AppState<S>>,
  CurrentController(mut controller): CurrentController,
) -> Result<Json<Controller>>
where
  S: ShiftStore + 'static,
{
  if !controller.privacy_accepted {
    state
      .store
      .accept_privacy_policy(controller.id)
      .await
      .map_err(Error::store)?;
    controller.privacy_accepted = true;
    info!(id = controller.id, "privacy policy accepted");
  }
  Ok(Json(controller))
}
