//! Tick scheduler
//!
//! Holds at most one pending tick per kind. Every arm recomputes the fire
//! instant from the current wall clock and the kind's cadence, so the
//! scheduler realigns itself after late or missed fires.
//!
//! The scheduler never sleeps. Drivers ask for `next_deadline()`, wait, then
//! drain `take_due(now)` and re-arm whatever should continue.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{Cadence, WORLD_HOUR_IN_WALL_MS};

/// Kinds of scheduled ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TickKind {
    /// Seconds hand / readout refresh
    Second,
    /// World-hour edge (or world-minute child for the digital readout)
    WorldHourBoundary,
    /// Animation frame
    AnimationFrame,
    /// Forecast refresh request
    RefreshRequest,
    /// Ambient-mode hourly redraw
    AmbientHourly,
}

impl TickKind {
    pub const ALL: [TickKind; 5] = [
        TickKind::Second,
        TickKind::WorldHourBoundary,
        TickKind::AnimationFrame,
        TickKind::RefreshRequest,
        TickKind::AmbientHourly,
    ];
}

/// A pending tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledTick {
    pub kind: TickKind,
    pub fire_at_wall_millis: i64,
}

/// Display mode of the owning screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Interactive,
    Ambient,
    Hidden,
}

impl DisplayMode {
    /// Tick kinds valid in this mode
    pub fn kinds(self) -> &'static [TickKind] {
        match self {
            DisplayMode::Interactive => &[
                TickKind::Second,
                TickKind::WorldHourBoundary,
                TickKind::AnimationFrame,
                TickKind::RefreshRequest,
            ],
            DisplayMode::Ambient => &[TickKind::AmbientHourly],
            DisplayMode::Hidden => &[],
        }
    }

    pub fn allows(self, kind: TickKind) -> bool {
        self.kinds().contains(&kind)
    }
}

/// Default cadence per tick kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub second: Cadence,
    pub world_hour: Cadence,
    pub frame_interval_ms: i64,
    pub refresh: Cadence,
    pub ambient: Cadence,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            second: Cadence::aligned(1000),
            world_hour: Cadence::aligned(WORLD_HOUR_IN_WALL_MS),
            frame_interval_ms: 1000 / 30,
            refresh: Cadence::aligned(60_000),
            ambient: Cadence::aligned(WORLD_HOUR_IN_WALL_MS),
        }
    }
}

impl SchedulerConfig {
    /// Digital readout variant: world-minute children of a 3-world-minute parent
    pub fn digital() -> Self {
        SchedulerConfig {
            world_hour: Cadence::subdivided(8750, 3),
            ..SchedulerConfig::default()
        }
    }

    /// Cadence used by `TickScheduler::arm` for `kind` at `now`
    pub fn cadence_for(&self, kind: TickKind, now: i64) -> Cadence {
        match kind {
            TickKind::Second => self.second,
            TickKind::WorldHourBoundary => self.world_hour,
            TickKind::AnimationFrame => Cadence::frame(self.frame_interval_ms, now),
            TickKind::RefreshRequest => self.refresh,
            TickKind::AmbientHourly => self.ambient,
        }
    }
}

/// One-pending-tick-per-kind scheduler
pub struct TickScheduler {
    config: SchedulerConfig,
    pending: BTreeMap<TickKind, i64>,
}

impl TickScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        TickScheduler {
            config,
            pending: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Arm `kind` with its default cadence, replacing any pending tick
    pub fn arm(&mut self, kind: TickKind, now: i64) -> i64 {
        let cadence = self.config.cadence_for(kind, now);
        self.arm_with(kind, cadence, now)
    }

    /// Arm `kind` with an explicit cadence
    pub fn arm_with(&mut self, kind: TickKind, cadence: Cadence, now: i64) -> i64 {
        let at = cadence.next_fire(now);
        debug!(?kind, ?cadence, now, at, "arm tick");
        self.pending.insert(kind, at);
        at
    }

    /// Arm `kind` at an absolute wall instant
    pub fn arm_at(&mut self, kind: TickKind, at: i64) {
        self.pending.insert(kind, at);
    }

    /// Cancel a pending tick. Returns whether one was pending.
    pub fn cancel(&mut self, kind: TickKind) -> bool {
        self.pending.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Cancel everything and arm the kinds valid in `mode`.
    /// The animation and refresh ticks fire immediately on entering a mode.
    pub fn enter_mode(&mut self, mode: DisplayMode, now: i64) {
        self.cancel_all();
        for &kind in mode.kinds() {
            match kind {
                TickKind::AnimationFrame | TickKind::RefreshRequest => {
                    self.arm_with(kind, Cadence::Immediate, now);
                }
                _ => {
                    self.arm(kind, now);
                }
            }
        }
        debug!(?mode, pending = self.pending.len(), "entered display mode");
    }

    pub fn pending(&self, kind: TickKind) -> Option<ScheduledTick> {
        self.pending.get(&kind).map(|&at| ScheduledTick {
            kind,
            fire_at_wall_millis: at,
        })
    }

    pub fn is_armed(&self, kind: TickKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest pending fire instant
    pub fn next_deadline(&self) -> Option<i64> {
        self.pending.values().copied().min()
    }

    /// Remove and return every tick due at `now`, ordered by fire time then kind
    pub fn take_due(&mut self, now: i64) -> Vec<ScheduledTick> {
        let mut due: Vec<ScheduledTick> = self
            .pending
            .iter()
            .filter(|&(_, &at)| at <= now)
            .map(|(&kind, &at)| ScheduledTick {
                kind,
                fire_at_wall_millis: at,
            })
            .collect();

        for tick in &due {
            self.pending.remove(&tick.kind);
        }

        due.sort_by_key(|t| (t.fire_at_wall_millis, t.kind));
        due
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rearm_replaces_pending() {
        let mut s = TickScheduler::default();
        s.arm(TickKind::Second, 100);
        s.arm(TickKind::Second, 1_500);

        assert_eq!(s.pending_count(), 1);
        assert_eq!(s.pending(TickKind::Second).unwrap().fire_at_wall_millis, 2_000);
    }

    #[test]
    fn test_take_due_orders_by_time_then_kind() {
        let mut s = TickScheduler::default();
        s.arm_at(TickKind::RefreshRequest, 500);
        s.arm_at(TickKind::Second, 500);
        s.arm_at(TickKind::WorldHourBoundary, 300);
        s.arm_at(TickKind::AmbientHourly, 900);

        let due = s.take_due(500);
        let kinds: Vec<_> = due.iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![TickKind::WorldHourBoundary, TickKind::Second, TickKind::RefreshRequest]
        );
        assert_eq!(s.pending_count(), 1);
        assert_eq!(s.next_deadline(), Some(900));
    }

    #[test]
    fn test_enter_mode_arms_subset() {
        let mut s = TickScheduler::default();
        s.enter_mode(DisplayMode::Interactive, 10_000);

        assert_eq!(s.pending_count(), 4);
        assert_eq!(s.pending(TickKind::AnimationFrame).unwrap().fire_at_wall_millis, 10_000);
        assert_eq!(s.pending(TickKind::WorldHourBoundary).unwrap().fire_at_wall_millis, 175_000);

        s.enter_mode(DisplayMode::Ambient, 20_000);
        assert_eq!(s.pending_count(), 1);
        assert!(s.is_armed(TickKind::AmbientHourly));

        s.enter_mode(DisplayMode::Hidden, 30_000);
        assert_eq!(s.pending_count(), 0);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_digital_world_hour_cadence() {
        let mut s = TickScheduler::new(SchedulerConfig::digital());
        assert_eq!(s.arm(TickKind::WorldHourBoundary, 0), 2917);
    }

    #[test]
    fn test_late_fire_realigns() {
        let mut s = TickScheduler::default();
        s.arm(TickKind::Second, 0);
        // Handler runs 1.7 s late
        let due = s.take_due(2_700);
        assert_eq!(due.len(), 1);
        assert_eq!(s.arm(TickKind::Second, 2_700), 3_000);
    }

    proptest! {
        #[test]
        fn prop_single_pending_per_kind(
            arms in proptest::collection::vec((0usize..5, 0i64..10_000_000), 1..50)
        ) {
            let mut s = TickScheduler::default();
            for (k, now) in &arms {
                s.arm(TickKind::ALL[*k], *now);
            }
            let distinct: std::collections::HashSet<usize> = arms.iter().map(|(k, _)| *k).collect();
            prop_assert_eq!(s.pending_count(), distinct.len());
        }
    }
}
