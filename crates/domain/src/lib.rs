//! Shared types for the fieldlink crates: the error taxonomy, immutable
//! configuration values, and structured trace events.

pub mod config;
pub mod error;
pub mod trace;

pub use error::{Error, Result};
