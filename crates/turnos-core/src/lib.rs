//! Core types and trait definitions for the controller shift roster.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! roster parser, the SQLite backend and the web layer all depend on it.

pub mod controller;
pub mod directory;
pub mod error;
pub mod import;
pub mod names;
pub mod session;
pub mod shift;
pub mod store;
pub mod users;

pub use error::{Error, Result};
