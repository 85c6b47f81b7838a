//! Controller directory export and restore.
//!
//! The directory is exported as the list of [`Controller`] records. Ids are
//! local to one store, so a restore ignores them and matches each record by
//! its name key first and its e-mail second.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  controller::{Controller, NewController},
  names::{name_key, placeholder_email},
  session::RosterSession,
};

/// What a directory restore did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySummary {
  pub inserted:  usize,
  pub updated:   usize,
  pub unchanged: usize,
  /// Records without a name, which rosters could never match.
  pub skipped:   usize,
}

/// Upsert `records` through `session`.
///
/// A matching controller takes every field of its record. A stored identity
/// UID is kept when the record has none. Unmatched records are inserted.
pub fn restore_controllers<S, I>(
  session: &mut S,
  records: I,
) -> Result<DirectorySummary, S::Error>
where
  S: RosterSession,
  I: IntoIterator<Item = Controller>,
{
  let mut summary = DirectorySummary::default();

  for record in records {
    let key = name_key(&record.name_key);
    if key.is_empty() {
      warn!(id = record.id, email = %record.email, "controller record without name; skipping");
      summary.skipped += 1;
      continue;
    }

    let email = match record.email.trim() {
      "" => placeholder_email(&key),
      e => e.to_owned(),
    };

    let existing = match session.find_controller_by_key(&key)? {
      Some(found) => Some(found),
      None => session.find_controller_by_email(&email)?,
    };

    let new = NewController {
      firebase_uid: record.firebase_uid,
      email,
      given_name: record.given_name,
      surnames: record.surnames,
      name_key: key,
      role: record.role,
      team: record.team,
      license_number: record.license_number,
      is_admin: record.is_admin,
      privacy_accepted: record.privacy_accepted,
    };

    match existing {
      Some(current) => {
        let mut restored = new.with_id(current.id);
        if restored.firebase_uid.is_none() {
          restored.firebase_uid = current.firebase_uid.clone();
        }
        if restored == current {
          summary.unchanged += 1;
        } else {
          session.update_controller(&restored)?;
          debug!(id = restored.id, controller = %restored.name_key, "restored controller");
          summary.updated += 1;
        }
      }
      None => {
        let inserted = session.insert_controller(new)?;
        debug!(id = inserted.id, controller = %inserted.name_key, "added controller");
        summary.inserted += 1;
      }
    }
  }

  Ok(summary)
}
