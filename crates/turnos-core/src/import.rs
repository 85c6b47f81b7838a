//! Upload orchestrator: turns roster entries into controllers and shifts on
//! a single [`RosterSession`].
//!
//! The backend wraps [`import_entries`] in one transaction and commits only
//! if it returns `Ok`; any error leaves the store exactly as it was.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  names::name_key,
  session::RosterSession,
  shift::{NewShift, RosterEntry},
  users::{create_user, find_user, update_user},
};

/// What an import did.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct ImportSummary {
  pub controllers_inserted: usize,
  /// Existing controllers whose category or team changed.
  pub controllers_updated:  usize,
  pub shifts_inserted:      usize,
  /// Entries already present in the store.
  pub shifts_skipped:       usize,
  /// Entries for controllers not in the store when `add_new` is off.
  pub entries_ignored:      usize,
}

impl ImportSummary {
  /// `(controllers inserted, shifts inserted)`.
  pub fn counts(&self) -> (usize, usize) {
    (self.controllers_inserted, self.shifts_inserted)
  }
}

fn resolve<S: RosterSession>(
  entry: &RosterEntry,
  add_new: bool,
  session: &mut S,
  summary: &mut ImportSummary,
) -> Result<Option<i64>, S::Error> {
  match find_user(&entry.name, session)? {
    Some(mut controller) => {
      if update_user(&mut controller, &entry.role, entry.team.as_deref()) {
        session.update_controller_assignment(&controller)?;
        summary.controllers_updated += 1;
        debug!(
          id = controller.id,
          role = %controller.role,
          team = ?controller.team,
          "updated controller assignment",
        );
      }
      Ok(Some(controller.id))
    }
    None if add_new => {
      let controller = create_user(
        &entry.name,
        &entry.role,
        entry.team.as_deref(),
        session,
        None,
      )?;
      summary.controllers_inserted += 1;
      Ok(Some(controller.id))
    }
    None => {
      info!(name = %entry.name, "controller not registered; ignoring roster row");
      Ok(None)
    }
  }
}

/// Import `entries` through `session`.
///
/// Each distinct name is resolved once. Unknown controllers are created only
/// when `add_new` is set; otherwise their entries are ignored. Shifts that
/// already exist are skipped, so importing the same roster twice is a no-op.
pub fn import_entries<S, I>(
  session: &mut S,
  entries: I,
  add_new: bool,
) -> Result<ImportSummary, S::Error>
where
  S: RosterSession,
  I: IntoIterator<Item = RosterEntry>,
{
  let mut summary = ImportSummary::default();
  let mut resolved: HashMap<String, Option<i64>> = HashMap::new();

  for entry in entries {
    let key = name_key(&entry.name);
    let controller_id = match resolved.get(&key) {
      Some(id) => *id,
      None => {
        let id = resolve(&entry, add_new, session, &mut summary)?;
        resolved.insert(key, id);
        id
      }
    };

    let Some(controller_id) = controller_id else {
      summary.entries_ignored += 1;
      continue;
    };

    let shift = NewShift { controller_id, date: entry.date, code: entry.code };
    if session.shift_exists(&shift)? {
      summary.shifts_skipped += 1;
      continue;
    }
    session.insert_shift(&shift)?;
    summary.shifts_inserted += 1;
  }

  info!(
    controllers_inserted = summary.controllers_inserted,
    controllers_updated = summary.controllers_updated,
    shifts_inserted = summary.shifts_inserted,
    shifts_skipped = summary.shifts_skipped,
    entries_ignored = summary.entries_ignored,
    "roster import finished",
  );
  Ok(summary)
}
