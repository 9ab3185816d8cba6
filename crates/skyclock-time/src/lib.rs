//! Skyclock Time - World clock and tick scheduling
//!
//! This crate implements:
//! - World time: a synthetic calendar running RATE× faster than wall time
//! - 8-world-hour forecast windows and their canonical time ids
//! - Cadences: wall-clock aligned, sub-divided, animation frame
//! - The tick scheduler (one pending tick per kind, realigned on every arm)
//! - Animation progress and the refresh cadence decision
//! - The drawing-free clock face read model

pub mod animation;
pub mod cadence;
pub mod clock;
pub mod face;
pub mod refresh;
pub mod scheduler;
pub mod world;

pub use animation::*;
pub use cadence::*;
pub use clock::*;
pub use face::*;
pub use refresh::*;
pub use scheduler::*;
pub use world::*;
