//! Skyclock Test Harness - Deterministic role testing
//!
//! This crate provides:
//! - A lossy, seeded message channel
//! - A scripted forecast provider
//! - A primary/companion pair driven by a manual clock

pub mod chaos;
pub mod harness;
pub mod provider;

pub use chaos::*;
pub use harness::*;
pub use provider::*;
