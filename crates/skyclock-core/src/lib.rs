//! Skyclock Core - Fundamental types shared by both device roles
//!
//! This crate defines:
//! - Shared key/value records (Record, Value)
//! - Wire paths and record keys
//! - Area selection identifiers
//! - Error types

pub mod area;
pub mod error;
pub mod paths;
pub mod record;

pub use area::*;
pub use error::*;
pub use paths::*;
pub use record::*;
