//! Skyclock Transport - Message channels between roles
//!
//! This crate provides:
//! - The `MessageChannel` send primitive with peer reachability
//! - In-process peer links with a reachability switch
//! - UDP channel with a background receive loop

pub mod channel;
pub mod udp;

pub use channel::*;
pub use udp::*;
