//! Skyclock Wire Protocol - Binary message format
//!
//! A message is a path plus an optional record payload:
//! - Magic (4 bytes)
//! - Path length + UTF-8 path
//! - Payload length + JSON-encoded record (length 0 = no payload)

pub mod frame;

pub use frame::*;
