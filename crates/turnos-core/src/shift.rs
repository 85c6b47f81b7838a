//! Shift types: the `(controller, date, code)` facts produced by a roster.
//!
//! Shifts are never updated. A re-imported roster only adds the triples that
//! are not already stored.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Period ──────────────────────────────────────────────────────────────────

/// The part of the day a shift covers, encoded as the first letter of the
/// code in the monthly roster.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::AsRefStr,
  strum::Display,
)]
pub enum ShiftPeriod {
  /// Mañana.
  #[strum(serialize = "M")]
  #[serde(rename = "M")]
  Morning,
  /// Tarde.
  #[strum(serialize = "T")]
  #[serde(rename = "T")]
  Evening,
  /// Noche.
  #[strum(serialize = "N")]
  #[serde(rename = "N")]
  Night,
}

// ─── Code ────────────────────────────────────────────────────────────────────

/// A validated shift code as printed in a roster cell: `M`, `T`, `N`, one of
/// those letters followed by a duty suffix (`MB09`), or a bare duty code.
///
/// Always upper-case ASCII alphanumeric, at most [`ShiftCode::MAX_LEN`] chars.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ShiftCode(String);

impl ShiftCode {
  pub const MAX_LEN: usize = 10;

  pub fn parse(raw: &str) -> Result<Self> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = !code.is_empty()
      && code.len() <= Self::MAX_LEN
      && code.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
      Ok(Self(code))
    } else {
      Err(Error::InvalidShiftCode(raw.to_owned()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }

  /// The period encoded by the leading letter, if any.
  pub fn period(&self) -> Option<ShiftPeriod> {
    self.0.get(..1).and_then(|p| p.parse().ok())
  }

  /// The specific duty: the suffix after the period letter, or the whole
  /// code when it has no period letter. `None` for a bare `M`/`T`/`N`.
  pub fn duty(&self) -> Option<&str> {
    let rest = match self.period() {
      Some(_) => self.0.get(1..).unwrap_or_default(),
      None => self.0.as_str(),
    };
    (!rest.is_empty()).then_some(rest)
  }
}

impl fmt::Display for ShiftCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for ShiftCode {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<ShiftCode> for String {
  fn from(code: ShiftCode) -> Self { code.0 }
}

// ─── Team ────────────────────────────────────────────────────────────────────

/// Normalize a team cell. Blank input means "no team"; anything other than
/// a single ASCII letter is rejected.
pub fn normalize_team(raw: &str) -> Result<Option<String>> {
  let team = raw.trim();
  if team.is_empty() {
    return Ok(None);
  }
  let mut chars = team.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) if c.is_ascii_alphabetic() => {
      Ok(Some(c.to_ascii_uppercase().to_string()))
    }
    _ => Err(Error::InvalidTeam(raw.to_owned())),
  }
}

// ─── Shift ───────────────────────────────────────────────────────────────────

/// A persisted shift record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
  pub id:            i64,
  pub controller_id: i64,
  pub date:          NaiveDate,
  pub code:          ShiftCode,
}

/// A shift about to be stored; also the key used for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewShift {
  pub controller_id: i64,
  pub date:          NaiveDate,
  pub code:          ShiftCode,
}

// ─── Roster entries ──────────────────────────────────────────────────────────

/// One non-blank roster cell, carrying the row's name, category and team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
  /// Controller name as printed, "APELLIDOS NOMBRE".
  pub name: String,
  pub role: String,
  pub team: Option<String>,
  pub date: NaiveDate,
  pub code: ShiftCode,
}

// ─── Calendar ────────────────────────────────────────────────────────────────

/// A shift joined with the controller's display name, for calendar reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
  pub shift_id:        i64,
  pub date:            NaiveDate,
  pub code:            ShiftCode,
  pub period:          Option<ShiftPeriod>,
  pub controller_id:   i64,
  pub controller_name: String,
  pub team:            Option<String>,
}
