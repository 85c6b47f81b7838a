//! [`TxSession`]: the [`RosterSession`] used by imports, logins and
//! directory restores.

use rusqlite::{Connection, OptionalExtension as _, params};
use turnos_core::{
  controller::{Controller, NewController},
  session::RosterSession,
  shift::{NewShift, Shift},
};

use crate::encode::{CONTROLLER_COLUMNS, controller_from_row, encode_date};

/// Repository operations over a connection with an open transaction.
///
/// Statements are prepared through the connection's statement cache, since a
/// roster import repeats the same few statements thousands of times.
pub(crate) struct TxSession<'a> {
  conn: &'a Connection,
}

impl<'a> TxSession<'a> {
  pub(crate) fn new(tx: &'a rusqlite::Transaction<'_>) -> Self { Self { conn: tx } }
}

impl RosterSession for TxSession<'_> {
  type Error = rusqlite::Error;

  fn find_controller_by_key(&mut self, key: &str) -> rusqlite::Result<Option<Controller>> {
    self
      .conn
      .prepare_cached(&format!(
        "SELECT {CONTROLLER_COLUMNS} FROM controllers c WHERE c.name_key = ?1"
      ))?
      .query_row(params![key], controller_from_row)
      .optional()
  }

  fn find_controller_by_email(&mut self, email: &str) -> rusqlite::Result<Option<Controller>> {
    self
      .conn
      .prepare_cached(&format!(
        "SELECT {CONTROLLER_COLUMNS} FROM controllers c WHERE c.email = ?1"
      ))?
      .query_row(params![email.trim()], controller_from_row)
      .optional()
  }

  fn insert_controller(&mut self, new: NewController) -> rusqlite::Result<Controller> {
    self
      .conn
      .prepare_cached(
        "INSERT INTO controllers (
           firebase_uid, email, given_name, surnames, name_key,
           role, team, license_number, is_admin, privacy_accepted
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      )?
      .execute(params![
        new.firebase_uid,
        new.email,
        new.given_name,
        new.surnames,
        new.name_key,
        new.role,
        new.team,
        new.license_number,
        new.is_admin,
        new.privacy_accepted,
      ])?;
    Ok(new.with_id(self.conn.last_insert_rowid()))
  }

  fn update_controller_assignment(&mut self, controller: &Controller) -> rusqlite::Result<()> {
    self
      .conn
      .prepare_cached("UPDATE controllers SET role = ?1, team = ?2 WHERE id = ?3")?
      .execute(params![controller.role, controller.team, controller.id])?;
    Ok(())
  }

  fn update_controller_identity(&mut self, controller: &Controller) -> rusqlite::Result<()> {
    self
      .conn
      .prepare_cached("UPDATE controllers SET email = ?1, is_admin = ?2 WHERE id = ?3")?
      .execute(params![controller.email, controller.is_admin, controller.id])?;
    Ok(())
  }

  fn update_controller(&mut self, controller: &Controller) -> rusqlite::Result<()> {
    self
      .conn
      .prepare_cached(
        "UPDATE controllers SET
           firebase_uid = ?1, email = ?2, given_name = ?3, surnames = ?4,
           name_key = ?5, role = ?6, team = ?7, license_number = ?8,
           is_admin = ?9, privacy_accepted = ?10
         WHERE id = ?11",
      )?
      .execute(params![
        controller.firebase_uid,
        controller.email,
        controller.given_name,
        controller.surnames,
        controller.name_key,
        controller.role,
        controller.team,
        controller.license_number,
        controller.is_admin,
        controller.privacy_accepted,
        controller.id,
      ])?;
    Ok(())
  }

  fn shift_exists(&mut self, shift: &NewShift) -> rusqlite::Result<bool> {
    self
      .conn
      .prepare_cached(
        "SELECT EXISTS (
           SELECT 1 FROM shifts WHERE controller_id = ?1 AND date = ?2 AND code = ?3
         )",
      )?
      .query_row(
        params![shift.controller_id, encode_date(shift.date), shift.code.as_str()],
        |r| r.get(0),
      )
  }

  fn insert_shift(&mut self, shift: &NewShift) -> rusqlite::Result<Shift> {
    self
      .conn
      .prepare_cached("INSERT INTO shifts (controller_id, date, code) VALUES (?1, ?2, ?3)")?
      .execute(params![shift.controller_id, encode_date(shift.date), shift.code.as_str()])?;
    Ok(Shift {
      id:            self.conn.last_insert_rowid(),
      controller_id: shift.controller_id,
      date:          shift.date,
      code:          shift.code.clone(),
    })
  }
}
