//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` and timestamps as fixed-width RFC 3339
//! UTC strings, so both compare correctly as text.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use turnos_core::{
  controller::Controller,
  shift::{CalendarEntry, ShiftCode},
};

use crate::{Error, Result};

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Column list matching [`controller_from_row`]; expects the table aliased `c`.
pub const CONTROLLER_COLUMNS: &str = "c.id, c.firebase_uid, c.email, c.given_name, \
   c.surnames, c.name_key, c.role, c.team, c.license_number, c.is_admin, \
   c.privacy_accepted";

pub fn controller_from_row(row: &Row<'_>) -> rusqlite::Result<Controller> {
  Ok(Controller {
    id:               row.get(0)?,
    firebase_uid:     row.get(1)?,
    email:            row.get(2)?,
    given_name:       row.get(3)?,
    surnames:         row.get(4)?,
    name_key:         row.get(5)?,
    role:             row.get(6)?,
    team:             row.get(7)?,
    license_number:   row.get(8)?,
    is_admin:         row.get(9)?,
    privacy_accepted: row.get(10)?,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `shifts` row joined with its controller.
pub struct RawCalendarEntry {
  pub shift_id:      i64,
  pub date:          String,
  pub code:          String,
  pub controller_id: i64,
  pub given_name:    String,
  pub surnames:      String,
  pub team:          Option<String>,
}

impl RawCalendarEntry {
  pub const COLUMNS: &'static str =
    "s.id, s.date, s.code, s.controller_id, c.given_name, c.surnames, c.team";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      shift_id:      row.get(0)?,
      date:          row.get(1)?,
      code:          row.get(2)?,
      controller_id: row.get(3)?,
      given_name:    row.get(4)?,
      surnames:      row.get(5)?,
      team:          row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<CalendarEntry> {
    let code = ShiftCode::parse(&self.code)?;
    Ok(CalendarEntry {
      shift_id:        self.shift_id,
      date:            decode_date(&self.date)?,
      period:          code.period(),
      code,
      controller_id:   self.controller_id,
      controller_name: format!("{} {}", self.given_name, self.surnames).trim().to_owned(),
      team:            self.team,
    })
  }
}
