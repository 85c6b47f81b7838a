//! Controller resolver/upserter.
//!
//! Finds controllers by normalized name, creates the ones first seen in a
//! roster and keeps their category and team in sync with the latest roster.

use tracing::{debug, warn};

use crate::{
  controller::{Controller, NewController},
  names::{capitaliza_nombre, name_key, parse_name, placeholder_email},
  session::RosterSession,
};

/// Find a controller by name (`"APELLIDOS NOMBRE"`).
///
/// The comparison is exact on [`name_key`], so encoding accidents, case and
/// spacing do not create different people.
pub fn find_user<S: RosterSession>(
  name: &str,
  session: &mut S,
) -> Result<Option<Controller>, S::Error> {
  session.find_controller_by_key(&name_key(name))
}

fn clean_team(team: Option<&str>) -> Option<String> {
  team.map(str::trim).filter(|t| !t.is_empty()).map(str::to_uppercase)
}

/// Create a controller unless one with the same name already exists, in
/// which case that one is returned unchanged.
///
/// When `email` is `None` a placeholder address is derived from the name.
/// The insert is staged on `session`; committing is up to the caller.
pub fn create_user<S: RosterSession>(
  name: &str,
  role: &str,
  team: Option<&str>,
  session: &mut S,
  email: Option<&str>,
) -> Result<Controller, S::Error> {
  if let Some(existing) = find_user(name, session)? {
    warn!(
      controller = %existing.name_key,
      id = existing.id,
      "controller already exists; not creating another with the same name",
    );
    return Ok(existing);
  }

  let parsed = parse_name(name.trim());
  let (given_name, surnames) = capitaliza_nombre(&parsed.given, &parsed.surnames);

  let email = match email.map(str::trim) {
    Some(e) if !e.is_empty() => e.to_owned(),
    _ => placeholder_email(name),
  };

  let new = NewController {
    firebase_uid: None,
    email,
    given_name,
    surnames,
    name_key: name_key(name),
    role: role.trim().to_owned(),
    team: clean_team(team),
    license_number: String::new(),
    is_admin: false,
    privacy_accepted: false,
  };
  debug!(controller = %new.name_key, email = %new.email, "creating controller");
  session.insert_controller(new)
}

/// Bring `role` and `team` up to date. Empty values never overwrite stored
/// ones. Returns `true` only when something actually changed, so callers can
/// skip the write otherwise.
pub fn update_user(controller: &mut Controller, role: &str, team: Option<&str>) -> bool {
  let mut changed = false;

  let role = role.trim();
  if !role.is_empty() && controller.role != role {
    controller.role = role.to_owned();
    changed = true;
  }

  if let Some(team) = clean_team(team)
    && controller.team.as_deref() != Some(team.as_str())
  {
    controller.team = Some(team);
    changed = true;
  }

  changed
}

/// First-login bootstrap for a configured user.
///
/// A controller already created from a roster under the same name is claimed
/// by giving it the real e-mail; otherwise a new record is created. Admin
/// rights are only ever granted here, never revoked.
pub fn bootstrap_user<S: RosterSession>(
  name: &str,
  email: &str,
  is_admin: bool,
  session: &mut S,
) -> Result<Controller, S::Error> {
  let mut controller = create_user(name, "", None, session, Some(email))?;

  let grant_admin = is_admin && !controller.is_admin;
  if controller.email != email || grant_admin {
    controller.email = email.to_owned();
    controller.is_admin |= is_admin;
    session.update_controller_identity(&controller)?;
    debug!(id = controller.id, email, "claimed controller for login");
  }

  Ok(controller)
}
