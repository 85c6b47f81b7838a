//! Route handlers, one module per resource.

pub mod calendar;
pub mod controllers;
pub mod session;
