//! End-to-end scenarios for the primary/companion pair

use proptest::prelude::*;

use skyclock_core::{
    AreaId, Record, SkyError, KEY_WEATHER_AREA, KEY_WEATHER_LIST, PATH_DATA_AREA, PATH_DATA_WEATHER,
};
use skyclock_runtime::{ProviderForecast, RoleEvent, RuntimeConfig};
use skyclock_state::SyncStore;
use skyclock_test::{ChaosConfig, PairHarness, ScriptedProvider};
use skyclock_time::{DisplayMode, TickKind, WorldClock, WINDOW_IN_WALL_MS};

/// One second into a window, far from the epoch
const T0: i64 = WINDOW_IN_WALL_MS * 1000 + 1_000;

fn started(provider: ScriptedProvider) -> PairHarness {
    let mut h = PairHarness::with_parts(
        RuntimeConfig::default(),
        ChaosConfig::lossless(),
        0,
        provider,
        T0,
    );
    h.start();
    h.advance_by(0);
    h
}

fn window_id(now: i64) -> String {
    WorldClock::to_world_ms(now).window_start().time_id()
}

#[test]
fn test_full_snapshot_switches_to_long_cadence() {
    let mut h = started(ScriptedProvider::full(24));
    h.companion_event(RoleEvent::AreaSelected(AreaId::new(4)));

    let cache = h.companion.cache();
    assert!(cache.got_full_data());
    assert_eq!(cache.confirmed_window_id(), Some(window_id(T0).as_str()));
    assert_eq!(h.stats().requests_delivered, 1);

    // Refresh ticks inside the confirmed window send nothing
    h.advance_to(T0 + 5 * 60_000);
    assert_eq!(h.stats().requests_delivered, 1);
    assert!(h.companion.stats().refresh_held >= 1);
    assert_eq!(
        h.companion
            .scheduler()
            .pending(TickKind::RefreshRequest)
            .unwrap()
            .fire_at_wall_millis,
        WINDOW_IN_WALL_MS * 1001
    );

    // The next window needs new data
    h.advance_to(WINDOW_IN_WALL_MS * 1001);
    assert_eq!(h.stats().requests_delivered, 2);
    assert_eq!(
        h.companion.cache().confirmed_window_id(),
        Some(window_id(WINDOW_IN_WALL_MS * 1001).as_str())
    );
}

#[test]
fn test_area_without_entries_triggers_immediate_refresh() {
    let areas = (1..=24).filter(|&a| a != 7).map(AreaId::new).collect();
    let mut h = started(ScriptedProvider::for_areas(areas));

    h.companion_event(RoleEvent::AreaSelected(AreaId::new(4)));
    assert!(h.companion.visible_forecast(h.now()).iter().all(Option::is_some));
    let before = h.stats().requests_delivered;

    h.companion_event(RoleEvent::AreaSelected(AreaId::new(7)));

    assert_eq!(h.companion.area(), AreaId::new(7));
    assert_eq!(h.primary.area(), AreaId::new(7));
    assert_eq!(h.companion.visible_forecast(h.now()), [None, None, None, None]);
    assert_eq!(h.stats().requests_delivered, before + 1);
}

#[test]
fn test_unreachable_primary_retries_on_cadence() {
    let mut h = PairHarness::new(T0);
    h.set_reachable(false);
    h.start();
    h.advance_by(0);

    assert_eq!(h.companion.stats().refresh_failed, 1);
    assert_eq!(h.stats().requests_delivered, 0);
    let retry = h
        .companion
        .scheduler()
        .pending(TickKind::RefreshRequest)
        .unwrap()
        .fire_at_wall_millis;
    assert_eq!(retry % 60_000, 0);

    h.advance_to(retry);
    assert_eq!(h.companion.stats().refresh_failed, 2);

    h.set_reachable(true);
    h.advance_by(60_000);
    assert_eq!(h.stats().requests_delivered, 1);
    assert!(h.companion.cache().got_full_data());
}

#[test]
fn test_partial_snapshot_keeps_short_cadence() {
    let provider = ScriptedProvider::full(24);
    provider.set_row_limit(Some(119));
    let mut h = started(provider);

    assert!(!h.companion.cache().got_full_data());
    h.advance_to(T0 + 5 * 60_000);

    // One request per minute boundary
    assert_eq!(h.stats().requests_delivered, 6);
    assert_eq!(h.stats().snapshots_delivered, 6);
}

#[test]
fn test_provider_failure_recovers_next_minute() {
    let provider = ScriptedProvider::full(24);
    provider.fail_next(1);
    let mut h = started(provider.clone());

    assert_eq!(h.primary.stats().provider_failures, 1);
    assert!(!h.companion.cache().got_full_data());

    h.advance_by(60_000);
    assert!(h.companion.cache().got_full_data());
    assert_eq!(provider.calls(), 2);
}

#[test]
fn test_lossy_link_converges() {
    let mut h = PairHarness::with_parts(
        RuntimeConfig::default(),
        ChaosConfig::poor(),
        42,
        ScriptedProvider::full(24),
        T0,
    );
    h.start();
    h.advance_to(T0 + 30 * 60_000);

    assert!(h.companion.cache().got_full_data());
    assert!(h.chaos_stats().messages_sent >= 1);
}

#[test]
fn test_snapshot_merge_keeps_local_keys() {
    let mut h = PairHarness::new(T0);
    let mut local = Record::new();
    local
        .put_int("KEY_LOCAL_NOTE", 9)
        .put_list(KEY_WEATHER_LIST, Vec::new());
    h.store.put(PATH_DATA_WEATHER, local).unwrap();

    h.start();
    h.advance_by(0);

    let stored = h.store.fetch(PATH_DATA_WEATHER).unwrap();
    assert_eq!(stored.get_int("KEY_LOCAL_NOTE"), Some(9));
    assert_eq!(stored.get_list(KEY_WEATHER_LIST).unwrap().len(), 120);
}

#[test]
fn test_out_of_range_provider_rows_dropped() {
    let provider = ScriptedProvider::full(24);
    provider.push_extra_row(ProviderForecast {
        window: 4,
        area: AreaId::new(4),
        code: 999,
    });
    let h = started(provider);

    assert_eq!(h.primary.stats().rows_dropped, 1);
    assert!(h.companion.cache().got_full_data());
}

#[test]
fn test_ambient_mode_stops_refresh_requests() {
    let mut h = started(ScriptedProvider::full(24));
    h.companion_event(RoleEvent::AmbientChanged(true));
    assert_eq!(h.companion.mode(), DisplayMode::Ambient);

    let before = h.stats().requests_delivered;
    h.advance_by(10 * 60_000);

    assert_eq!(h.stats().requests_delivered, before);
    assert!(h.companion.scheduler().is_armed(TickKind::AmbientHourly));
    assert!(!h.companion.scheduler().is_armed(TickKind::RefreshRequest));
}

#[test]
fn test_store_outage_is_not_fatal() {
    let mut h = started(ScriptedProvider::full(24));
    h.store.set_offline(true);

    h.companion_event(RoleEvent::AreaSelected(AreaId::new(3)));
    assert!(matches!(h.store.fetch(PATH_DATA_WEATHER), Err(SkyError::Store(_))));

    h.store.set_offline(false);
    h.advance_by(60_000);
    assert_eq!(h.companion.area(), AreaId::new(3));
    assert!(h.companion.cache().has_entries());
}

#[test]
fn test_malformed_area_after_start_is_reset() {
    let mut h = started(ScriptedProvider::full(24));

    let mut bad = Record::new();
    bad.put_text(KEY_WEATHER_AREA, "north");
    h.store.put(PATH_DATA_AREA, bad).unwrap();
    h.pump();

    let stored = h.store.fetch(PATH_DATA_AREA).unwrap();
    assert_eq!(stored.get_int(KEY_WEATHER_AREA), Some(0));
    assert_eq!(h.companion.area(), AreaId::NONE);
    assert_eq!(h.primary.area(), AreaId::NONE);
}

#[test]
fn test_restart_with_stale_snapshot_requests_refresh() {
    let mut h = started(ScriptedProvider::full(24));
    h.companion_event(RoleEvent::AreaSelected(AreaId::new(4)));
    let stored = h.store.fetch(PATH_DATA_WEATHER).unwrap();

    // Same store, ten windows later
    let later = T0 + 10 * WINDOW_IN_WALL_MS;
    let mut restarted = PairHarness::new(later);
    restarted.store.put(PATH_DATA_WEATHER, stored).unwrap();
    restarted
        .store
        .put(PATH_DATA_AREA, Record::new().with_int(KEY_WEATHER_AREA, 4))
        .unwrap();
    restarted.start();
    assert!(!restarted.companion.cache().got_full_data());

    restarted.advance_by(0);
    assert_eq!(restarted.stats().requests_delivered, 1);
    assert_eq!(
        restarted.companion.cache().confirmed_window_id(),
        Some(window_id(later).as_str())
    );
    assert!(restarted.companion.visible_forecast(later).iter().all(Option::is_some));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_first_exchange_confirms_current_window(start in 0i64..2_000_000_000_000) {
        let mut h = PairHarness::new(start);
        h.start();
        h.advance_by(0);

        prop_assert!(h.companion.cache().got_full_data());
        let expected_id = window_id(start);
        prop_assert_eq!(h.companion.cache().confirmed_window_id(), Some(expected_id.as_str()));
    }
}
