//! Companion role
//!
//! Owns the rendering context: the tick scheduler, the hand animation, the
//! forecast cache and the area selection. Sends refresh requests and merges
//! the snapshots the primary answers with.
//!
//! No error leaves `handle`. Failed sends and store errors are logged and the
//! next refresh tick retries.

use tracing::{debug, info, warn};

use skyclock_core::{AreaId, SkyResult, KEY_WEATHER_LIST, PATH_DATA_AREA, PATH_DATA_WEATHER};
use skyclock_state::{
    AreaSelection, ForecastCache, ForecastEntry, Snapshot, StoreChange, StoreSubscription,
    SyncStore,
};
use skyclock_time::{
    Animation, ClockFace, DisplayMode, RefreshPolicy, ScheduledTick, TickKind, TickScheduler,
    WorldClock, VISIBLE_WINDOWS,
};
use skyclock_transport::MessageChannel;
use skyclock_wire::Message;

use crate::{Role, RoleEvent, RuntimeConfig, SyncProtocol, LOOKAHEAD_WINDOWS, LOOKBACK_WINDOWS};

/// Companion counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompanionStats {
    pub ticks: u64,
    pub redraws: u64,
    pub refresh_sent: u64,
    pub refresh_held: u64,
    pub refresh_failed: u64,
    pub snapshots_merged: u64,
    pub area_changes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SnapshotSource {
    /// Merged from a primary's answer
    Ingested,
    /// Read back from the replicated store
    Stored,
}

/// Companion (rendering) role
pub struct Companion<S: SyncStore, C: MessageChannel> {
    protocol: SyncProtocol<S, C>,
    scheduler: TickScheduler,
    animation: Animation,
    cache: ForecastCache,
    area: AreaSelection,
    refresh: RefreshPolicy,
    expected_snapshot_len: usize,
    default_area: AreaId,
    visible: bool,
    ambient: bool,
    mode: DisplayMode,
    stats: CompanionStats,
}

impl<S: SyncStore, C: MessageChannel> Companion<S, C> {
    pub fn new(config: &RuntimeConfig, store: S, channel: C) -> Self {
        let initial = config.initial_mode();
        Companion {
            protocol: SyncProtocol::new(store, channel),
            scheduler: TickScheduler::new(config.scheduler_config()),
            animation: config.animation(),
            cache: ForecastCache::new(),
            area: AreaSelection::default(),
            refresh: config.refresh_policy(),
            expected_snapshot_len: config.expected_snapshot_len,
            default_area: config.default_area(),
            visible: initial != DisplayMode::Hidden,
            ambient: initial == DisplayMode::Ambient,
            mode: DisplayMode::Hidden,
            stats: CompanionStats::default(),
        }
    }

    pub fn protocol(&self) -> &SyncProtocol<S, C> {
        &self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut SyncProtocol<S, C> {
        &mut self.protocol
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }

    pub fn area(&self) -> AreaId {
        self.area.current()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn animation_value(&self) -> f64 {
        self.animation.value()
    }

    pub fn stats(&self) -> &CompanionStats {
        &self.stats
    }

    /// Forecast lookup by canonical time id
    pub fn lookup(&self, time_id: &str) -> Option<&ForecastEntry> {
        self.cache.lookup(time_id)
    }

    /// Read model for the current frame
    pub fn face(&self, now: i64, local_hour: u32, local_minute: u32) -> ClockFace {
        ClockFace::at(now, local_hour, local_minute, self.mode)
    }

    /// Condition codes of the four visible windows, `None` where unknown
    pub fn visible_forecast(&self, now: i64) -> [Option<i32>; VISIBLE_WINDOWS] {
        let world = WorldClock::to_world_ms(now);
        [0i64, 1, 2, 3].map(|n| {
            self.cache
                .lookup(&world.offset_windows(n).time_id())
                .map(|e| e.condition_code)
        })
    }

    fn now_window_id(now: i64) -> String {
        WorldClock::to_world_ms(now).window_start().time_id()
    }

    fn target_mode(&self) -> DisplayMode {
        if !self.visible {
            DisplayMode::Hidden
        } else if self.ambient {
            DisplayMode::Ambient
        } else {
            DisplayMode::Interactive
        }
    }

    fn apply_mode(&mut self, now: i64) {
        let mode = self.target_mode();
        if mode == self.mode {
            return;
        }
        info!(from = ?self.mode, to = ?mode, "display mode change");
        self.mode = mode;
        self.scheduler.enter_mode(mode, now);
        if mode == DisplayMode::Interactive {
            self.animation.start(now);
        } else {
            self.animation.reset();
        }
    }

    fn on_tick(&mut self, kind: TickKind, now: i64) {
        self.stats.ticks += 1;
        match kind {
            TickKind::Second | TickKind::WorldHourBoundary | TickKind::AmbientHourly => {
                self.stats.redraws += 1;
                if self.mode.allows(kind) {
                    self.scheduler.arm(kind, now);
                }
            }
            TickKind::AnimationFrame => {
                self.stats.redraws += 1;
                if let Some(next) = self.animation.advance(now) {
                    self.scheduler.arm_with(kind, next, now);
                }
            }
            TickKind::RefreshRequest => self.on_refresh_tick(now),
        }
    }

    fn on_refresh_tick(&mut self, now: i64) {
        let now_id = Self::now_window_id(now);
        let decision = self.refresh.decide(
            self.cache.got_full_data(),
            self.cache.confirmed_window_id(),
            &now_id,
        );
        debug!(?decision, window = %now_id, "refresh tick");

        if decision.dispatches() {
            self.send_refresh();
        } else {
            self.stats.refresh_held += 1;
        }
        if self.mode.allows(TickKind::RefreshRequest) {
            self.scheduler
                .arm_with(TickKind::RefreshRequest, decision.next(), now);
        }
    }

    fn send_refresh(&mut self) {
        match self.protocol.request_refresh() {
            Ok(_) => self.stats.refresh_sent += 1,
            Err(e) => {
                self.stats.refresh_failed += 1;
                if e.is_connectivity() {
                    warn!("refresh request dropped: no peer reachable");
                } else {
                    warn!(error = %e, "refresh request failed");
                }
            }
        }
    }

    /// Rebuild the cache from a decoded snapshot.
    /// A stored snapshot only confirms the current window when it carries
    /// that window's whole range; an ingested one was built for now.
    fn apply_snapshot(&mut self, snapshot: &Snapshot, source: SnapshotSource, now: i64) {
        if !snapshot.present {
            return;
        }
        self.cache.rebuild(&snapshot.entries, self.area.current());

        let now_id = Self::now_window_id(now);
        if source == SnapshotSource::Stored && !Self::covers_current_range(snapshot, now) {
            debug!(window = %now_id, entries = snapshot.len, "stored snapshot is not for the current window");
            return;
        }
        self.cache
            .record_snapshot(snapshot.len, &now_id, self.expected_snapshot_len);
    }

    fn covers_current_range(snapshot: &Snapshot, now: i64) -> bool {
        let world = WorldClock::to_world_ms(now);
        let first = world.offset_windows(LOOKBACK_WINDOWS).time_id();
        let last = world.offset_windows(LOOKAHEAD_WINDOWS).time_id();
        let has = |id: &str| snapshot.entries.iter().any(|e| e.window_start_id == id);
        has(&first) && has(&last)
    }

    fn on_message(&mut self, message: Message, now: i64) {
        if message.path != PATH_DATA_WEATHER {
            debug!(path = %message.path, "companion ignoring message");
            return;
        }
        match self.protocol.ingest_weather(&message) {
            Ok(snapshot) => {
                self.stats.snapshots_merged += 1;
                info!(entries = snapshot.len, area = %self.area.current(), "forecast snapshot merged");
                self.apply_snapshot(&snapshot, SnapshotSource::Ingested, now);
            }
            Err(e) => warn!(error = %e, "forecast snapshot not merged"),
        }
    }

    fn on_store_change(&mut self, change: StoreChange, now: i64) {
        match change.path.as_str() {
            PATH_DATA_AREA => {
                // Malformed writes are repaired from the current stored record
                let area = match AreaSelection::from_record(&change.record) {
                    Some(area) => Ok(area),
                    None => self.protocol.read_area(self.default_area),
                };
                match area {
                    Ok(area) => self.on_area_changed(area, now),
                    Err(e) => warn!(error = %e, "area record unreadable"),
                }
            }
            PATH_DATA_WEATHER => {
                let snapshot = match change.record.get_list(KEY_WEATHER_LIST) {
                    Some(_) => Ok(Snapshot::decode(&change.record)),
                    None => self.protocol.read_weather(),
                };
                match snapshot {
                    Ok(snapshot) => self.apply_snapshot(&snapshot, SnapshotSource::Stored, now),
                    Err(e) => warn!(error = %e, "stored snapshot unreadable"),
                }
            }
            other => debug!(path = other, "unhandled store path"),
        }
    }

    fn on_area_changed(&mut self, area: AreaId, now: i64) {
        let previous = self.area.current();
        if !self.area.set(area) {
            return;
        }
        self.stats.area_changes += 1;
        info!(from = %previous, to = %area, "area changed");

        self.cache.invalidate();
        match self.protocol.read_weather() {
            Ok(snapshot) => self.apply_snapshot(&snapshot, SnapshotSource::Stored, now),
            Err(e) => warn!(error = %e, "stored snapshot unreadable"),
        }
        if !self.cache.has_entries() {
            self.send_refresh();
        }
    }

    fn on_area_selected(&mut self, area: AreaId, now: i64) {
        if !area.is_valid() {
            return;
        }
        if let Err(e) = self.protocol.select_area(area) {
            warn!(error = %e, %area, "area selection not replicated");
        }
        self.on_area_changed(area, now);
    }

    fn load_stored(&mut self, now: i64) -> SkyResult<()> {
        let (snapshot, area) = self.protocol.initialize_defaults(self.default_area)?;
        self.area.set(area);
        self.apply_snapshot(&snapshot, SnapshotSource::Stored, now);
        Ok(())
    }

    /// Store subscription for the driver
    pub fn subscribe(&mut self) -> StoreSubscription {
        self.protocol.subscribe()
    }
}

impl<S: SyncStore, C: MessageChannel> Role for Companion<S, C> {
    fn name(&self) -> &'static str {
        "companion"
    }

    fn start(&mut self, now: i64) {
        if let Err(e) = self.load_stored(now) {
            warn!(error = %e, "startup defaults not applied");
        }
        self.apply_mode(now);
    }

    fn handle(&mut self, event: RoleEvent, now: i64) {
        match event {
            RoleEvent::Tick(kind) => self.on_tick(kind, now),
            RoleEvent::Message(message) => self.on_message(message, now),
            RoleEvent::StoreChanged(change) => self.on_store_change(change, now),
            RoleEvent::VisibilityChanged(visible) => {
                self.visible = visible;
                self.apply_mode(now);
            }
            RoleEvent::AmbientChanged(ambient) => {
                self.ambient = ambient;
                self.apply_mode(now);
            }
            RoleEvent::AreaSelected(area) => self.on_area_selected(area, now),
            RoleEvent::Shutdown => {
                self.scheduler.cancel_all();
                self.animation.reset();
                self.mode = DisplayMode::Hidden;
                self.protocol.teardown();
            }
        }
    }

    fn next_deadline(&self) -> Option<i64> {
        self.scheduler.next_deadline()
    }

    fn fire_due(&mut self, now: i64) -> Vec<ScheduledTick> {
        let due = self.scheduler.take_due(now);
        for tick in &due {
            self.handle(RoleEvent::Tick(tick.kind), now);
        }
        due
    }
}
