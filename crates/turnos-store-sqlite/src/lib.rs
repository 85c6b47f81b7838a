//! SQLite backend for the controller shift roster.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. A roster import runs entirely
//! inside one `call` closure and one transaction.

mod encode;
mod schema;
mod session;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
