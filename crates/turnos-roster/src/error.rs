//! Error types for the roster parser.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document does not have the roster table structure.
  #[error("invalid roster format: {0}")]
  InvalidFormat(String),

  #[error("unreadable PDF: {0}")]
  Pdf(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
