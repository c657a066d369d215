//! Bus database model and DBC adapter
//!
//! This module contains the message/signal records the compiler consumes
//! and the conversion from DBC files parsed by `can-dbc`.

pub mod database;
pub mod dbc;

// Re-export key types for convenience
pub use database::{Database, DatabaseStats, Endianness, Message, Signal};
