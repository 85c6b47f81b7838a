//! The `RosterSession` trait: repository operations inside one open
//! transaction.
//!
//! A session is handed explicitly to the resolver and the import
//! orchestrator. Writes made through it are visible to later lookups on the
//! same session but are only made durable when the backend commits, which
//! it does once per import.

use crate::{
  controller::{Controller, NewController},
  shift::{NewShift, Shift},
};

/// Synchronous unit-of-work over a storage backend.
pub trait RosterSession {
  type Error;

  /// Look up a controller by its normalized `name_key`.
  fn find_controller_by_key(
    &mut self,
    key: &str,
  ) -> Result<Option<Controller>, Self::Error>;

  /// Look up a controller by login e-mail, ignoring ASCII case.
  fn find_controller_by_email(
    &mut self,
    email: &str,
  ) -> Result<Option<Controller>, Self::Error>;

  /// Stage a new controller; the returned record carries its assigned id.
  fn insert_controller(
    &mut self,
    new: NewController,
  ) -> Result<Controller, Self::Error>;

  /// Persist the `role` and `team` of an existing controller.
  fn update_controller_assignment(
    &mut self,
    controller: &Controller,
  ) -> Result<(), Self::Error>;

  /// Persist the login e-mail and admin flag of an existing controller.
  fn update_controller_identity(
    &mut self,
    controller: &Controller,
  ) -> Result<(), Self::Error>;

  /// Persist every field of an existing controller except its id.
  fn update_controller(
    &mut self,
    controller: &Controller,
  ) -> Result<(), Self::Error>;

  /// Whether an identical `(controller, date, code)` shift is stored.
  fn shift_exists(&mut self, shift: &NewShift) -> Result<bool, Self::Error>;

  /// Stage a new shift.
  fn insert_shift(&mut self, shift: &NewShift) -> Result<Shift, Self::Error>;
}
