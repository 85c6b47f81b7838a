//! [`SqliteStore`]: the SQLite implementation of [`ShiftStore`].

use std::path::Path;

use chrono::{Duration, Utc};
use rusqlite::{OptionalExtension as _, params};
use tracing::debug;
use uuid::Uuid;

use turnos_core::{
  controller::Controller,
  directory::{DirectorySummary, restore_controllers},
  import::{ImportSummary, import_entries},
  shift::{CalendarEntry, RosterEntry},
  store::{LoginSession, ShiftQuery, ShiftStore},
  users::bootstrap_user,
};

use crate::{
  Error, Result,
  encode::{
    CONTROLLER_COLUMNS, RawCalendarEntry, controller_from_row, encode_date, encode_dt,
  },
  schema::SCHEMA,
  session::TxSession,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A roster store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a single-row `UPDATE` on `controllers`, failing if `id` is unknown.
  async fn update_controller(
    &self,
    id: i64,
    sql: &'static str,
    value: rusqlite::types::Value,
  ) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, params![value, id])?))
      .await?;
    if changed == 0 {
      return Err(Error::ControllerNotFound(id));
    }
    Ok(())
  }

  /// Execute raw SQL outside the store API, for tests that tamper with rows.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<usize> {
    Ok(self.conn.call(move |conn| Ok(conn.execute(sql, [])?)).await?)
  }
}

// ─── ShiftStore impl ─────────────────────────────────────────────────────────

impl ShiftStore for SqliteStore {
  type Error = Error;

  // ── Controllers ───────────────────────────────────────────────────────────

  async fn get_controller(&self, id: i64) -> Result<Option<Controller>> {
    let controller = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONTROLLER_COLUMNS} FROM controllers c WHERE c.id = ?1"),
              params![id],
              controller_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(controller)
  }

  async fn find_controller_by_email(&self, email: &str) -> Result<Option<Controller>> {
    let email = email.trim().to_owned();
    let controller = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONTROLLER_COLUMNS} FROM controllers c WHERE c.email = ?1"),
              params![email],
              controller_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(controller)
  }

  async fn list_controllers(&self) -> Result<Vec<Controller>> {
    let controllers = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTROLLER_COLUMNS} FROM controllers c
           ORDER BY c.surnames, c.given_name, c.id"
        ))?;
        let rows = stmt
          .query_map([], controller_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(controllers)
  }

  async fn bootstrap_controller(
    &self,
    name: String,
    email: String,
    is_admin: bool,
  ) -> Result<Controller> {
    let controller = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let controller = bootstrap_user(&name, &email, is_admin, &mut TxSession::new(&tx))?;
        tx.commit()?;
        Ok(controller)
      })
      .await?;
    debug!(id = controller.id, email = %controller.email, "bootstrapped controller");
    Ok(controller)
  }

  async fn import_controllers(&self, records: Vec<Controller>) -> Result<DirectorySummary> {
    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let summary = restore_controllers(&mut TxSession::new(&tx), records)?;
        tx.commit()?;
        Ok(summary)
      })
      .await?;
    debug!(?summary, "controller directory import committed");
    Ok(summary)
  }

  async fn link_firebase_uid(&self, id: i64, uid: String) -> Result<()> {
    self
      .update_controller(
        id,
        "UPDATE controllers SET firebase_uid = ?1 WHERE id = ?2",
        uid.into(),
      )
      .await
  }

  async fn accept_privacy_policy(&self, id: i64) -> Result<()> {
    self
      .update_controller(
        id,
        "UPDATE controllers SET privacy_accepted = ?1 WHERE id = ?2",
        true.into(),
      )
      .await
  }

  // ── Shifts ────────────────────────────────────────────────────────────────

  async fn list_shifts(&self, query: &ShiftQuery) -> Result<Vec<CalendarEntry>> {
    let from = query.from.map(encode_date);
    let to = query.to.map(encode_date);
    let controller_id = query.controller_id;

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM shifts s
           JOIN controllers c ON c.id = s.controller_id
           WHERE (?1 IS NULL OR s.date >= ?1)
             AND (?2 IS NULL OR s.date <= ?2)
             AND (?3 IS NULL OR s.controller_id = ?3)",
          RawCalendarEntry::COLUMNS,
        ))?;
        let rows = stmt
          .query_map(params![from, to, controller_id], RawCalendarEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut entries = raws
      .into_iter()
      .map(RawCalendarEntry::into_entry)
      .collect::<Result<Vec<_>>>()?;

    // Codes without a period letter go after M, T and N on the same day.
    entries.sort_by(|a, b| {
      (a.date, a.period.is_none(), a.period, &a.controller_name, &a.code).cmp(&(
        b.date,
        b.period.is_none(),
        b.period,
        &b.controller_name,
        &b.code,
      ))
    });
    Ok(entries)
  }

  async fn import_roster<I>(&self, entries: I, add_new: bool) -> Result<ImportSummary>
  where
    I: IntoIterator<Item = RosterEntry> + Send + 'static,
  {
    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let summary = import_entries(&mut TxSession::new(&tx), entries, add_new)?;
        tx.commit()?;
        Ok(summary)
      })
      .await?;
    debug!(?summary, "roster import committed");
    Ok(summary)
  }

  // ── Login sessions ────────────────────────────────────────────────────────

  async fn create_session(&self, controller_id: i64, ttl: Duration) -> Result<LoginSession> {
    let created_at = Utc::now();
    let session = LoginSession {
      token: Uuid::new_v4().simple().to_string(),
      controller_id,
      created_at,
      expires_at: created_at + ttl,
    };

    let token = session.token.clone();
    let now_str = encode_dt(created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now_str])?;
        conn.execute(
          "INSERT INTO sessions (token, controller_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![token, controller_id, now_str, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(session)
  }

  async fn session_controller(&self, token: &str) -> Result<Option<Controller>> {
    let token = token.to_owned();
    let now_str = encode_dt(Utc::now());

    let controller = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTROLLER_COLUMNS} FROM sessions s
                 JOIN controllers c ON c.id = s.controller_id
                 WHERE s.token = ?1 AND s.expires_at > ?2"
              ),
              params![token, now_str],
              controller_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(controller)
  }

  async fn delete_session(&self, token: &str) -> Result<()> {
    let token = token.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
