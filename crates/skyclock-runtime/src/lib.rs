//! Skyclock Runtime - Role orchestration
//!
//! This crate wires the world clock, the tick scheduler and the replicated
//! store into the two device roles:
//! - Companion: renders, schedules ticks, requests forecast refreshes
//! - Primary: answers refresh requests from the forecast provider
//!
//! Every input (tick, message, store change, control) becomes a `RoleEvent`
//! handled by one dispatcher per role.

pub mod companion;
pub mod config;
pub mod driver;
pub mod event;
pub mod logging;
pub mod primary;
pub mod protocol;
pub mod provider;

pub use companion::*;
pub use config::*;
pub use driver::*;
pub use event::*;
pub use logging::*;
pub use primary::*;
pub use protocol::*;
pub use provider::*;
