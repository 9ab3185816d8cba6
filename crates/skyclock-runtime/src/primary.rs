//! Primary role
//!
//! Answers `/request/fetch` with a `/data/weather` snapshot built from the
//! forecast provider. Snapshots carry the window before the current one and
//! the three after it.

use tracing::{debug, info, warn};

use skyclock_core::{
    AreaId, Record, KEY_WEATHER_LIST, PATH_DATA_AREA, PATH_DATA_WEATHER, PATH_REQUEST_FETCH,
};
use skyclock_state::{AreaSelection, ForecastEntry, StoreSubscription, SyncStore};
use skyclock_time::{ScheduledTick, WorldClock, WorldInstant};
use skyclock_transport::MessageChannel;

use crate::{
    ForecastProvider, ProviderForecast, Role, RoleEvent, RuntimeConfig, SyncProtocol,
    LOOKAHEAD_WINDOWS, LOOKBACK_WINDOWS,
};

/// Primary counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimaryStats {
    pub requests: u64,
    pub snapshots_sent: u64,
    pub rows_dropped: u64,
    pub provider_failures: u64,
    pub send_failures: u64,
}

/// Build the snapshot record for `now` from provider rows.
/// Rows outside the carried window range are dropped.
pub fn build_snapshot(rows: &[ProviderForecast], now: &WorldInstant) -> (Record, usize) {
    let mut list = Vec::with_capacity(rows.len());
    let mut dropped = 0;
    for row in rows {
        if !(LOOKBACK_WINDOWS..=LOOKAHEAD_WINDOWS).contains(&row.window) {
            dropped += 1;
            continue;
        }
        let window = now.offset_windows(row.window);
        list.push(ForecastEntry::to_record(&window, row.area, row.code));
    }
    (Record::new().with_list(KEY_WEATHER_LIST, list), dropped)
}

/// Primary (provider-owning) role
pub struct Primary<S: SyncStore, C: MessageChannel, P: ForecastProvider> {
    protocol: SyncProtocol<S, C>,
    provider: P,
    area: AreaSelection,
    default_area: AreaId,
    stats: PrimaryStats,
}

impl<S: SyncStore, C: MessageChannel, P: ForecastProvider> Primary<S, C, P> {
    pub fn new(config: &RuntimeConfig, store: S, channel: C, provider: P) -> Self {
        Primary {
            protocol: SyncProtocol::new(store, channel),
            provider,
            area: AreaSelection::default(),
            default_area: config.default_area(),
            stats: PrimaryStats::default(),
        }
    }

    pub fn protocol(&self) -> &SyncProtocol<S, C> {
        &self.protocol
    }

    pub fn area(&self) -> AreaId {
        self.area.current()
    }

    pub fn stats(&self) -> &PrimaryStats {
        &self.stats
    }

    pub fn subscribe(&mut self) -> StoreSubscription {
        self.protocol.subscribe()
    }

    fn on_fetch_request(&mut self, now: i64) {
        self.stats.requests += 1;
        let world = WorldClock::to_world_ms(now);

        let rows = match self.provider.fetch_forecast() {
            Ok(rows) => rows,
            Err(e) => {
                self.stats.provider_failures += 1;
                warn!(error = %e, "forecast provider failed");
                return;
            }
        };

        let (snapshot, dropped) = build_snapshot(&rows, &world);
        if dropped > 0 {
            self.stats.rows_dropped += dropped as u64;
            debug!(dropped, "provider rows outside window range");
        }

        match self.protocol.publish_snapshot(snapshot) {
            Ok(_) => self.stats.snapshots_sent += 1,
            Err(e) => {
                self.stats.send_failures += 1;
                if e.is_connectivity() {
                    warn!("snapshot dropped: no peer reachable");
                } else {
                    warn!(error = %e, "snapshot send failed");
                }
            }
        }
    }
}

impl<S: SyncStore, C: MessageChannel, P: ForecastProvider> Role for Primary<S, C, P> {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn start(&mut self, _now: i64) {
        match self.protocol.initialize_defaults(self.default_area) {
            Ok((_, area)) => {
                self.area.set(area);
            }
            Err(e) => warn!(error = %e, "startup defaults not applied"),
        }
    }

    fn handle(&mut self, event: RoleEvent, now: i64) {
        match event {
            RoleEvent::Message(message) if message.path == PATH_REQUEST_FETCH => {
                self.on_fetch_request(now)
            }
            RoleEvent::Message(message) => {
                debug!(path = %message.path, "primary ignoring message");
            }
            RoleEvent::StoreChanged(change) if change.path == PATH_DATA_AREA => {
                let area = match AreaSelection::from_record(&change.record) {
                    Some(area) => Ok(area),
                    None => self.protocol.read_area(self.default_area),
                };
                match area {
                    Ok(area) => {
                        if self.area.set(area) {
                            info!(%area, "primary observed area change");
                        }
                    }
                    Err(e) => warn!(error = %e, "area record unreadable"),
                }
            }
            RoleEvent::StoreChanged(change) if change.path == PATH_DATA_WEATHER => {
                if change.record.get_list(KEY_WEATHER_LIST).is_none() {
                    if let Err(e) = self.protocol.read_weather() {
                        warn!(error = %e, "stored snapshot unreadable");
                    }
                }
            }
            RoleEvent::AreaSelected(area) => {
                if let Err(e) = self.protocol.select_area(area) {
                    warn!(error = %e, %area, "area selection not replicated");
                } else {
                    self.area.set(area);
                }
            }
            RoleEvent::Shutdown => self.protocol.teardown(),
            other => debug!(event = other.label(), "primary ignoring event"),
        }
    }

    fn next_deadline(&self) -> Option<i64> {
        None
    }

    fn fire_due(&mut self, _now: i64) -> Vec<ScheduledTick> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyclock_core::{SkyError, SkyResult, KEY_WEATHER_AREA};
    use skyclock_state::{MemoryStore, Snapshot, StoreChange};
    use skyclock_transport::PeerLink;
    use skyclock_wire::Message;

    use crate::StaticProvider;

    struct FailingProvider;

    impl ForecastProvider for FailingProvider {
        fn fetch_forecast(&mut self) -> SkyResult<Vec<ProviderForecast>> {
            Err(SkyError::Provider("upstream 503".into()))
        }
    }

    #[test]
    fn test_fetch_request_answered_with_snapshot() {
        let (a, mut b) = PeerLink::pair();
        let mut primary = Primary::new(&RuntimeConfig::default(), MemoryStore::new(), a.link, StaticProvider::new(24));
        primary.start(0);

        let now = 1_400_000 * 10 + 700_000;
        primary.handle(RoleEvent::Message(Message::empty(PATH_REQUEST_FETCH)), now);

        let reply = b.inbox.try_recv().unwrap();
        assert_eq!(reply.path, PATH_DATA_WEATHER);
        let snapshot = Snapshot::decode(&reply.record());
        assert_eq!(snapshot.len, 120);

        let world = WorldClock::to_world_ms(now);
        let lookback = world.offset_windows(-1).time_id();
        let ahead = world.offset_windows(3).time_id();
        assert!(snapshot.entries.iter().any(|e| e.window_start_id == lookback));
        assert!(snapshot.entries.iter().any(|e| e.window_start_id == ahead));
        assert_eq!(primary.stats().snapshots_sent, 1);
    }

    #[test]
    fn test_out_of_range_rows_dropped() {
        let rows = vec![
            ProviderForecast { window: -2, area: AreaId::new(1), code: 1 },
            ProviderForecast { window: 0, area: AreaId::new(1), code: 2 },
            ProviderForecast { window: 4, area: AreaId::new(1), code: 3 },
        ];
        let (record, dropped) = build_snapshot(&rows, &WorldClock::to_world_ms(0));

        assert_eq!(dropped, 2);
        assert_eq!(record.get_list(KEY_WEATHER_LIST).unwrap().len(), 1);
    }

    #[test]
    fn test_provider_failure_sends_nothing() {
        let (a, mut b) = PeerLink::pair();
        let mut primary = Primary::new(&RuntimeConfig::default(), MemoryStore::new(), a.link, FailingProvider);
        primary.handle(RoleEvent::Message(Message::empty(PATH_REQUEST_FETCH)), 0);

        assert!(b.inbox.try_recv().is_err());
        assert_eq!(primary.stats().provider_failures, 1);
    }

    #[test]
    fn test_unreachable_companion_counted() {
        let (a, _b) = PeerLink::pair();
        a.link.set_reachable(false);
        let mut primary = Primary::new(&RuntimeConfig::default(), MemoryStore::new(), a.link, StaticProvider::new(1));
        primary.handle(RoleEvent::Message(Message::empty(PATH_REQUEST_FETCH)), 0);

        assert_eq!(primary.stats().send_failures, 1);
    }

    #[test]
    fn test_malformed_area_change_reset_to_default() {
        let store = MemoryStore::new();
        let (a, _b) = PeerLink::pair();
        let mut primary = Primary::new(&RuntimeConfig::default(), store.clone(), a.link, StaticProvider::new(1));
        primary.start(0);
        primary.handle(RoleEvent::AreaSelected(AreaId::new(5)), 0);

        let mut bad = Record::new();
        bad.put_text(KEY_WEATHER_AREA, "north");
        store.put(PATH_DATA_AREA, bad.clone()).unwrap();
        primary.handle(
            RoleEvent::StoreChanged(StoreChange {
                path: PATH_DATA_AREA.to_string(),
                record: bad,
            }),
            0,
        );

        let stored = store.fetch(PATH_DATA_AREA).unwrap();
        assert_eq!(stored.get_int(KEY_WEATHER_AREA), Some(0));
        assert_eq!(primary.area(), AreaId::NONE);
    }
}
