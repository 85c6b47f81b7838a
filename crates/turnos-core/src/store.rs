//! The `ShiftStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `turnos-store-sqlite`).
//! The web layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  controller::Controller,
  directory::DirectorySummary,
  import::ImportSummary,
  shift::{CalendarEntry, RosterEntry},
};

// ─── Query and record types ──────────────────────────────────────────────────

/// Parameters for [`ShiftStore::list_shifts`]. Date bounds are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftQuery {
  pub from:          Option<NaiveDate>,
  pub to:            Option<NaiveDate>,
  pub controller_id: Option<i64>,
}

/// A login session, identified by an opaque token kept in a cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
  pub token:         String,
  pub controller_id: i64,
  pub created_at:    DateTime<Utc>,
  pub expires_at:    DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a shift store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ShiftStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Controllers ───────────────────────────────────────────────────────

  /// Retrieve a controller by id. Returns `None` if not found.
  fn get_controller(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Controller>, Self::Error>> + Send + '_;

  fn find_controller_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Controller>, Self::Error>> + Send + 'a;

  /// All controllers ordered by surname and given name.
  fn list_controllers(
    &self,
  ) -> impl Future<Output = Result<Vec<Controller>, Self::Error>> + Send + '_;

  /// First-login bootstrap; see [`crate::users::bootstrap_user`].
  fn bootstrap_controller(
    &self,
    name: String,
    email: String,
    is_admin: bool,
  ) -> impl Future<Output = Result<Controller, Self::Error>> + Send + '_;

  /// Record the identity-provider UID on first login.
  fn link_firebase_uid(
    &self,
    id: i64,
    uid: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn accept_privacy_policy(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Run [`crate::directory::restore_controllers`] in one transaction.
  fn import_controllers(
    &self,
    records: Vec<Controller>,
  ) -> impl Future<Output = Result<DirectorySummary, Self::Error>> + Send + '_;

  // ── Shifts ────────────────────────────────────────────────────────────

  /// Calendar read, ordered by date, period and controller name.
  fn list_shifts<'a>(
    &'a self,
    query: &'a ShiftQuery,
  ) -> impl Future<Output = Result<Vec<CalendarEntry>, Self::Error>> + Send + 'a;

  /// Run [`crate::import::import_entries`] over `entries` in one transaction.
  ///
  /// Either every controller and shift is stored or, on error, none is.
  fn import_roster<I>(
    &self,
    entries: I,
    add_new: bool,
  ) -> impl Future<Output = Result<ImportSummary, Self::Error>> + Send + '_
  where
    I: IntoIterator<Item = RosterEntry> + Send + 'static;

  // ── Login sessions ────────────────────────────────────────────────────

  fn create_session(
    &self,
    controller_id: i64,
    ttl: Duration,
  ) -> impl Future<Output = Result<LoginSession, Self::Error>> + Send + '_;

  /// The controller owning an unexpired session, if any.
  fn session_controller<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Controller>, Self::Error>> + Send + 'a;

  fn delete_session<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
