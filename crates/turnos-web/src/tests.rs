//! Router tests against an in-memory store and a stub token verifier.

use std::{collections::HashMap, sync::Arc};

use axum::{
  body::Body,
  http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt as _;
use turnos_core::store::ShiftStore;
use turnos_store_sqlite::SqliteStore;

use crate::{
  AppState, BootstrapUser, ServerConfig,
  auth::{TokenVerifier, VerifiedIdentity, VerifyFuture},
  error::Error,
  router,
};

// ─── Fixture ─────────────────────────────────────────────────────────────────

struct StubVerifier {
  tokens: HashMap<&'static str, VerifiedIdentity>,
}

impl TokenVerifier for StubVerifier {
  fn verify<'a>(&'a self, id_token: &'a str) -> VerifyFuture<'a> {
    let result = self
      .tokens
      .get(id_token)
      .cloned()
      .ok_or_else(|| Error::InvalidToken("token rechazado".into()));
    Box::pin(async move { result })
  }
}

fn identity(uid: &str, email: &str) -> VerifiedIdentity {
  VerifiedIdentity { uid: uid.into(), email: email.into() }
}

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig {
    bootstrap_users: vec![BootstrapUser {
      email: "jefe@aena.test".into(),
      name:  "SALAS VIDAL CARMEN".into(),
      admin: true,
    }],
    ..ServerConfig::default()
  };
  let tokens = HashMap::from([
    ("admin-token", identity("uid-admin", "jefe@aena.test")),
    ("gil-token", identity("uid-gil", "gil.romero.manuel@example.com")),
    ("stranger-token", identity("uid-x", "nadie@otro.test")),
  ]);

  AppState {
    store:    Arc::new(store),
    config:   Arc::new(config),
    verifier: Arc::new(StubVerifier { tokens }),
  }
}

const ROSTER: &str = "\
TURNERO MENSUAL MAYO 2024
APELLIDOS NOMBRE | CAT | EQ | 1 | 2 | 3 | 4 | 5
GIL ROMERO MANUEL | TS | A | M | T | - | N |
PEÑA GOMEZ ANA | CON | B | . | MB09 | M | | T
";

const BOUNDARY: &str = "turnos-test-boundary";

/// `(field name, file name, content)` parts of a multipart body.
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
  let mut body = Vec::new();
  for (name, file_name, content) in parts {
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    let disposition = match file_name {
      Some(f) => format!(
        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
         Content-Type: text/plain\r\n\r\n"
      ),
      None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
    };
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
  body
}

struct Reply {
  status:  StatusCode,
  headers: HeaderMap,
  json:    Value,
}

async fn send(state: &AppState<SqliteStore>, req: Request<Body>) -> Reply {
  let resp = router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  Reply { status, headers, json }
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
  Request::builder()
    .uri(uri)
    .header(header::COOKIE, cookie)
    .body(Body::empty())
    .unwrap()
}

fn post(uri: &str, cookie: &str) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::COOKIE, cookie)
    .body(Body::empty())
    .unwrap()
}

fn upload(cookie: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri("/upload")
    .header(header::COOKIE, cookie)
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )
    .body(Body::from(multipart_body(parts)))
    .unwrap()
}

async fn login_reply(state: &AppState<SqliteStore>, token: &str) -> Reply {
  let req = Request::builder()
    .method("POST")
    .uri("/login")
    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
    .body(Body::from(format!("idToken={token}")))
    .unwrap();
  send(state, req).await
}

/// Log in and return the `Cookie` header value for the new session.
async fn login(state: &AppState<SqliteStore>, token: &str) -> String {
  let reply = login_reply(state, token).await;
  assert_eq!(reply.status, StatusCode::OK, "login failed: {}", reply.json);
  let set_cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
  set_cookie.split(';').next().unwrap().to_owned()
}

/// Log in as the bootstrap admin and accept the privacy policy.
async fn admin_session(state: &AppState<SqliteStore>) -> String {
  let cookie = login(state, "admin-token").await;
  assert_eq!(send(state, post("/api/privacy", &cookie)).await.status, StatusCode::OK);
  cookie
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_user_is_rejected() {
  let state = make_state().await;
  let reply = login_reply(&state, "stranger-token").await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
  assert_eq!(
    reply.json["error"],
    "Usuario no reconocido. Hable con el administrador."
  );
  assert!(!reply.headers.contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
  let state = make_state().await;
  let reply = login_reply(&state, "forged").await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bootstrap_admin_login_sets_session() {
  let state = make_state().await;
  let reply = login_reply(&state, "admin-token").await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.json["email"], "jefe@aena.test");
  assert_eq!(reply.json["is_admin"], true);
  assert_eq!(reply.json["firebase_uid"], "uid-admin");

  let set_cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
  assert!(set_cookie.starts_with("turnos_session="));
  assert!(set_cookie.contains("HttpOnly"));

  let cookie = set_cookie.split(';').next().unwrap();
  let me = send(&state, get("/api/me", cookie)).await;
  assert_eq!(me.status, StatusCode::OK);
  assert_eq!(me.json["name_key"], "SALAS VIDAL CARMEN");
  assert_eq!(me.json["given_name"], "Carmen");
}

#[tokio::test]
async fn json_login_body_is_accepted() {
  let state = make_state().await;
  let req = Request::builder()
    .method("POST")
    .uri("/login")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(r#"{"idToken":"admin-token"}"#))
    .unwrap();
  assert_eq!(send(&state, req).await.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_ends_session() {
  let state = make_state().await;
  let cookie = login(&state, "admin-token").await;

  let reply = send(&state, post("/logout", &cookie)).await;
  assert_eq!(reply.status, StatusCode::NO_CONTENT);
  let cleared = reply.headers[header::SET_COOKIE].to_str().unwrap();
  assert!(cleared.contains("Max-Age=0"));

  let me = send(&state, get("/api/me", &cookie)).await;
  assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

// ─── Guards ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn calendar_requires_session() {
  let state = make_state().await;
  let reply = send(&state, get("/api/shifts", "turnos_session=bogus")).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn calendar_requires_privacy_acceptance() {
  let state = make_state().await;
  let cookie = login(&state, "admin-token").await;

  let blocked = send(&state, get("/api/shifts", &cookie)).await;
  assert_eq!(blocked.status, StatusCode::FORBIDDEN);
  assert_eq!(blocked.json["error"], "Debe aceptar la política de privacidad");

  let accepted = send(&state, post("/api/privacy", &cookie)).await;
  assert_eq!(accepted.json["privacy_accepted"], true);

  let open = send(&state, get("/api/shifts", &cookie)).await;
  assert_eq!(open.status, StatusCode::OK);
  assert_eq!(open.json, serde_json::json!([]));
}

#[tokio::test]
async fn non_admin_cannot_upload_or_list_controllers() {
  let state = make_state().await;
  let admin = admin_session(&state).await;
  let reply = send(&state, upload(&admin, &[("file", Some("mayo.txt"), ROSTER.as_bytes()), ("add_new", None, b"on")])).await;
  assert_eq!(reply.status, StatusCode::OK);

  // Roster-created controllers log in with their placeholder e-mail.
  let gil = login(&state, "gil-token").await;
  send(&state, post("/api/privacy", &gil)).await;

  let listed = send(&state, get("/api/controllers", &gil)).await;
  assert_eq!(listed.status, StatusCode::FORBIDDEN);

  let uploaded = send(&state, upload(&gil, &[("file", Some("mayo.txt"), ROSTER.as_bytes())])).await;
  assert_eq!(uploaded.status, StatusCode::FORBIDDEN);

  let calendar = send(&state, get("/api/shifts", &gil)).await;
  assert_eq!(calendar.status, StatusCode::OK);
}

// ─── Upload ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_imports_roster_once() {
  let state = make_state().await;
  let cookie = admin_session(&state).await;
  let parts: &[(&str, Option<&str>, &[u8])] =
    &[("file", Some("mayo.txt"), ROSTER.as_bytes()), ("add_new", None, b"on")];

  let first = send(&state, upload(&cookie, parts)).await;
  assert_eq!(first.status, StatusCode::OK, "{}", first.json);
  assert_eq!(
    first.json["message"],
    "Archivo cargado con éxito. Usuarios reconocidos: 2, turnos agregados: 6"
  );
  assert_eq!(first.json["summary"]["shifts_inserted"], 6);

  let second = send(&state, upload(&cookie, parts)).await;
  assert_eq!(
    second.json["message"],
    "Archivo cargado con éxito. Usuarios reconocidos: 0, turnos agregados: 0"
  );
  assert_eq!(second.json["summary"]["shifts_skipped"], 6);

  let day = send(&state, get("/api/shifts?from=2024-05-02&to=2024-05-02", &cookie)).await;
  assert_eq!(day.status, StatusCode::OK);
  let days = day.json.as_array().unwrap();
  assert_eq!(days.len(), 1);
  assert_eq!(days[0]["date"], "2024-05-02");
  assert_eq!(days[0]["shifts"][0]["code"], "MB09");
  assert_eq!(days[0]["shifts"][0]["controller_name"], "Ana Peña Gomez");
  assert_eq!(days[0]["shifts"][1]["code"], "T");

  let controllers = send(&state, get("/api/controllers", &cookie)).await;
  assert_eq!(controllers.json.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn upload_without_add_new_ignores_unknown_controllers() {
  let state = make_state().await;
  let cookie = admin_session(&state).await;

  let reply = send(&state, upload(&cookie, &[("file", Some("mayo.txt"), ROSTER.as_bytes())])).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.json["summary"]["entries_ignored"], 6);
  assert_eq!(state.store.list_controllers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_upload_is_rejected_and_writes_nothing() {
  let state = make_state().await;
  let cookie = admin_session(&state).await;

  let reply = send(
    &state,
    upload(&cookie, &[("file", Some("notas.txt"), b"esto no es un turnero"), ("add_new", None, b"on")]),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  let message = reply.json["error"].as_str().unwrap();
  assert!(message.starts_with("Formato de archivo no válido: "), "{message}");
  assert_eq!(state.store.list_controllers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
  let state = make_state().await;
  let cookie = admin_session(&state).await;

  let reply = send(&state, upload(&cookie, &[("file", Some(""), b""), ("add_new", None, b"on")])).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.json["error"], "No se ha seleccionado un archivo");
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
  let state = make_state().await;
  let cookie = admin_session(&state).await;
  let reply = send(&state, get("/api/shifts?from=2024-05-10&to=2024-05-01", &cookie)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
