//! Skyclock State - Replicated records and the forecast cache
//!
//! This crate implements:
//! - The `SyncStore` fetch / merge-write / put contract with change subscription
//! - `MemoryStore`, an in-process replicated keyspace
//! - Forecast entry decoding and the per-window `ForecastCache`
//! - The selected weather area

pub mod forecast;
pub mod selection;
pub mod store;

pub use forecast::*;
pub use selection::*;
pub use store::*;
