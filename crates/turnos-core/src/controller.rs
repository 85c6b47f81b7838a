//! Controller: an air-traffic-controller user record.
//!
//! Controllers are matched during roster imports by their normalized
//! "apellidos nombre" key, never by primary key. See [`crate::names::name_key`].

use serde::{Deserialize, Serialize};

/// A persisted controller.
///
/// This is also the record format of a directory export; see
/// [`crate::directory`]. Fields a hand-written record may leave out default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
  #[serde(default)]
  pub id:               i64,
  /// Identity-provider UID, linked on first successful login.
  pub firebase_uid:     Option<String>,
  pub email:            String,
  /// Given name(s), capitalized (`"José Luis"`).
  pub given_name:       String,
  /// Surname(s), capitalized (`"García del Río"`).
  pub surnames:         String,
  /// Normalized `"APELLIDOS NOMBRE"` natural key used for roster matching.
  pub name_key:         String,
  /// Professional category: CON, PTD, TS, …
  #[serde(default)]
  pub role:             String,
  /// Rotation group, a single upper-case letter.
  pub team:             Option<String>,
  #[serde(default)]
  pub license_number:   String,
  #[serde(default)]
  pub is_admin:         bool,
  #[serde(default)]
  pub privacy_accepted: bool,
}

impl Controller {
  /// Display name in "given surnames" order.
  pub fn full_name(&self) -> String {
    format!("{} {}", self.given_name, self.surnames)
      .trim()
      .to_owned()
  }
}

/// Input to [`crate::session::RosterSession::insert_controller`].
/// The primary key is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewController {
  pub firebase_uid:     Option<String>,
  pub email:            String,
  pub given_name:       String,
  pub surnames:         String,
  pub name_key:         String,
  pub role:             String,
  pub team:             Option<String>,
  pub license_number:   String,
  pub is_admin:         bool,
  pub privacy_accepted: bool,
}

impl NewController {
  /// Attach a primary key, producing the persisted form.
  pub fn with_id(self, id: i64) -> Controller {
    Controller {
      id,
      firebase_uid: self.firebase_uid,
      email: self.email,
      given_name: self.given_name,
      surnames: self.surnames,
      name_key: self.name_key,
      role: self.role,
      team: self.team,
      license_number: self.license_number,
      is_admin: self.is_admin,
      privacy_accepted: self.privacy_accepted,
    }
  }
}
