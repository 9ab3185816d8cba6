//! Refresh cadence decision
//!
//! Short cadence while forecast data is incomplete or belongs to an older
//! window; long cadence once a full snapshot for the current window landed.

use crate::{Cadence, WINDOW_IN_WALL_MS};

/// Outcome of a refresh tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Send a refresh request, then re-arm with `next`
    Dispatch { next: Cadence },
    /// Data is current. Re-arm with `next` without sending.
    Hold { next: Cadence },
}

impl RefreshDecision {
    pub fn next(&self) -> Cadence {
        match *self {
            RefreshDecision::Dispatch { next } | RefreshDecision::Hold { next } => next,
        }
    }

    pub fn dispatches(&self) -> bool {
        matches!(self, RefreshDecision::Dispatch { .. })
    }
}

/// Short/long refresh periods in wall ms
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub short_period_ms: i64,
    pub long_period_ms: i64,
}

impl RefreshPolicy {
    pub fn new(short_period_ms: i64, long_period_ms: i64) -> Self {
        RefreshPolicy {
            short_period_ms,
            long_period_ms,
        }
    }

    /// Decide what a firing refresh tick does
    pub fn decide(
        &self,
        got_full_data: bool,
        confirmed_window_id: Option<&str>,
        now_window_id: &str,
    ) -> RefreshDecision {
        if got_full_data && confirmed_window_id == Some(now_window_id) {
            RefreshDecision::Hold {
                next: Cadence::aligned(self.long_period_ms),
            }
        } else {
            RefreshDecision::Dispatch {
                next: Cadence::aligned(self.short_period_ms),
            }
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(60_000, WINDOW_IN_WALL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_data_dispatches_short() {
        let policy = RefreshPolicy::default();
        let d = policy.decide(false, Some("1-00-00-08"), "1-00-00-08");

        assert!(d.dispatches());
        assert_eq!(d.next(), Cadence::aligned(60_000));
    }

    #[test]
    fn test_full_current_window_holds_long() {
        let policy = RefreshPolicy::default();
        let d = policy.decide(true, Some("1-00-00-08"), "1-00-00-08");

        assert!(!d.dispatches());
        assert_eq!(d.next(), Cadence::aligned(1_400_000));
    }

    #[test]
    fn test_stale_window_dispatches() {
        let policy = RefreshPolicy::default();
        assert!(policy.decide(true, Some("1-00-00-00"), "1-00-00-08").dispatches());
        assert!(policy.decide(true, None, "1-00-00-08").dispatches());
    }
}
