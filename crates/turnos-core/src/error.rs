//! Error types for `turnos-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unrecognized shift code: {0:?}")]
  InvalidShiftCode(String),

  #[error("invalid team code: {0:?}")]
  InvalidTeam(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
