//! API Module - Entry points for the CLI and embedding hosts
//!
//! Commands return serializable results and `String` errors so any
//! front end can forward them unchanged.

pub mod commands;

pub use commands::*;
