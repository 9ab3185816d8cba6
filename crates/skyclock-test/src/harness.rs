//! Deterministic primary/companion pair
//!
//! Both roles run in the calling thread against a manual clock. Time only
//! moves through `advance_to`, which steps from deadline to deadline and
//! delivers every queued message and store change between steps.

use tracing::debug;

use skyclock_core::{PATH_DATA_WEATHER, PATH_REQUEST_FETCH};
use skyclock_runtime::{Companion, Primary, Role, RoleEvent, RuntimeConfig};
use skyclock_state::{MemoryStore, StoreSubscription};
use skyclock_time::{ManualClock, WallClock};
use skyclock_transport::{MessageReceiver, PeerLink};

use crate::{ChaosConfig, ChaosStats, LossyChannel, ScriptedProvider};

pub type HarnessCompanion = Companion<MemoryStore, LossyChannel<PeerLink>>;
pub type HarnessPrimary = Primary<MemoryStore, PeerLink, ScriptedProvider>;

/// Delivery counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HarnessStats {
    pub requests_delivered: u64,
    pub snapshots_delivered: u64,
    pub store_changes_delivered: u64,
    pub steps: u64,
}

/// Primary and companion sharing one replicated store
pub struct PairHarness {
    pub clock: ManualClock,
    pub store: MemoryStore,
    pub companion: HarnessCompanion,
    pub primary: HarnessPrimary,
    pub provider: ScriptedProvider,
    link: PeerLink,
    companion_inbox: MessageReceiver,
    primary_inbox: MessageReceiver,
    companion_changes: StoreSubscription,
    primary_changes: StoreSubscription,
    stats: HarnessStats,
}

impl PairHarness {
    /// Lossless pair with a 24-area provider and default configuration
    pub fn new(start_millis: i64) -> Self {
        Self::with_parts(
            RuntimeConfig::default(),
            ChaosConfig::lossless(),
            0,
            ScriptedProvider::full(24),
            start_millis,
        )
    }

    pub fn with_parts(
        config: RuntimeConfig,
        chaos: ChaosConfig,
        seed: u64,
        provider: ScriptedProvider,
        start_millis: i64,
    ) -> Self {
        let clock = ManualClock::new(start_millis);
        let store = MemoryStore::new();
        let (companion_end, primary_end) = PeerLink::pair();
        let link = companion_end.link.clone();

        let mut companion = Companion::new(
            &config,
            store.clone(),
            LossyChannel::new(companion_end.link, chaos, seed),
        );
        let mut primary = Primary::new(&config, store.clone(), primary_end.link, provider.clone());
        let companion_changes = companion.subscribe();
        let primary_changes = primary.subscribe();

        PairHarness {
            clock,
            store,
            companion,
            primary,
            provider,
            link,
            companion_inbox: companion_end.inbox,
            primary_inbox: primary_end.inbox,
            companion_changes,
            primary_changes,
            stats: HarnessStats::default(),
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn stats(&self) -> &HarnessStats {
        &self.stats
    }

    /// Chaos counters of the companion → primary direction
    pub fn chaos_stats(&self) -> ChaosStats {
        self.companion.protocol().channel().stats()
    }

    /// Start both roles, primary first
    pub fn start(&mut self) {
        let now = self.now();
        self.primary.start(now);
        self.companion.start(now);
        self.pump();
    }

    /// Connect or disconnect the link between the roles
    pub fn set_reachable(&self, reachable: bool) {
        self.link.set_reachable(reachable);
    }

    /// Deliver one event to the companion, then pump
    pub fn companion_event(&mut self, event: RoleEvent) {
        let now = self.now();
        self.companion.handle(event, now);
        self.pump();
    }

    /// Deliver one event to the primary, then pump
    pub fn primary_event(&mut self, event: RoleEvent) {
        let now = self.now();
        self.primary.handle(event, now);
        self.pump();
    }

    /// Deliver queued messages and store changes until both roles are idle.
    /// Returns the number of events delivered.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let now = self.now();
            let mut moved = false;

            while let Ok(message) = self.primary_inbox.try_recv() {
                if message.path == PATH_REQUEST_FETCH {
                    self.stats.requests_delivered += 1;
                }
                self.primary.handle(RoleEvent::Message(message), now);
                delivered += 1;
                moved = true;
            }
            while let Ok(message) = self.companion_inbox.try_recv() {
                if message.path == PATH_DATA_WEATHER {
                    self.stats.snapshots_delivered += 1;
                }
                self.companion.handle(RoleEvent::Message(message), now);
                delivered += 1;
                moved = true;
            }
            while let Some(change) = self.primary_changes.try_recv() {
                self.stats.store_changes_delivered += 1;
                self.primary.handle(RoleEvent::StoreChanged(change), now);
                delivered += 1;
                moved = true;
            }
            while let Some(change) = self.companion_changes.try_recv() {
                self.stats.store_changes_delivered += 1;
                self.companion.handle(RoleEvent::StoreChanged(change), now);
                delivered += 1;
                moved = true;
            }

            if !moved {
                return delivered;
            }
        }
    }

    /// Step the clock from deadline to deadline up to `target`
    pub fn advance_to(&mut self, target: i64) {
        self.pump();
        while let Some(deadline) = self.companion.next_deadline() {
            if deadline > target {
                break;
            }
            let now = deadline.max(self.now());
            self.clock.set(now);
            let fired = self.companion.fire_due(now);
            self.stats.steps += 1;
            debug!(now, fired = fired.len(), "harness step");
            self.pump();
        }
        if target > self.now() {
            self.clock.set(target);
        }
        self.pump();
    }

    pub fn advance_by(&mut self, delta: i64) {
        let target = self.now() + delta;
        self.advance_to(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyclock_core::AreaId;
    use skyclock_time::TickKind;

    #[test]
    fn test_start_exchanges_first_snapshot() {
        let mut h = PairHarness::new(1_400_000 * 500 + 1_000);
        h.start();
        h.advance_by(0);

        assert_eq!(h.stats().requests_delivered, 1);
        assert_eq!(h.stats().snapshots_delivered, 1);
        assert!(h.companion.cache().got_full_data());
        // No area selected yet
        assert!(!h.companion.cache().has_entries());
    }

    #[test]
    fn test_seconds_tick_keeps_pace() {
        let mut h = PairHarness::new(0);
        h.start();
        h.advance_to(10_000);

        let second = h.companion.scheduler().pending(TickKind::Second).unwrap();
        assert_eq!(second.fire_at_wall_millis, 11_000);
    }

    #[test]
    fn test_primary_area_selection_reaches_companion() {
        let mut h = PairHarness::new(0);
        h.start();
        h.advance_by(0);
        h.primary_event(RoleEvent::AreaSelected(AreaId::new(5)));

        assert_eq!(h.companion.area(), AreaId::new(5));
        assert_eq!(h.companion.visible_forecast(h.now())[0], Some(ScriptedProvider::code_for(AreaId::new(5), 0)));
    }
}
