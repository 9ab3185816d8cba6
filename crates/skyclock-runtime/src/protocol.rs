//! Fetch-merge-put sync protocol
//!
//! Owns the store and the channel to the remote role. The refresh handshake:
//! 1. Companion sends an empty `/request/fetch`
//! 2. Primary answers with one `/data/weather` snapshot
//! 3. Companion merge-writes the snapshot into its store record
//!
//! Area changes travel through the store (`/data/area`), not as messages.

use std::time::Duration;

use tracing::{debug, info, warn};

use skyclock_core::{
    AreaId, Record, SkyError, SkyResult, KEY_WEATHER_AREA, KEY_WEATHER_LIST, PATH_DATA_AREA,
    PATH_DATA_WEATHER, PATH_REQUEST_FETCH,
};
use skyclock_state::{AreaSelection, Snapshot, StoreSubscription, SubscriptionId, SyncStore};
use skyclock_transport::MessageChannel;
use skyclock_wire::Message;

/// Poll interval while waiting for a peer
const CONNECT_POLL: Duration = Duration::from_millis(50);

/// Store + channel pair owned by one role
pub struct SyncProtocol<S: SyncStore, C: MessageChannel> {
    store: S,
    channel: C,
    subscription: Option<SubscriptionId>,
}

impl<S: SyncStore, C: MessageChannel> SyncProtocol<S, C> {
    pub fn new(store: S, channel: C) -> Self {
        SyncProtocol {
            store,
            channel,
            subscription: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Subscribe to store changes. The subscription is dropped on `teardown`.
    pub fn subscribe(&mut self) -> StoreSubscription {
        let subscription = self.store.subscribe();
        if let Some(old) = self.subscription.replace(subscription.id()) {
            self.store.unsubscribe(old);
        }
        subscription
    }

    /// Wait up to `wait` for a reachable peer
    pub async fn ensure_connected(&self, wait: Duration) -> SkyResult<usize> {
        let peers = self.channel.reachable_peers();
        if peers > 0 {
            return Ok(peers);
        }

        let poll = async {
            loop {
                tokio::time::sleep(CONNECT_POLL).await;
                let peers = self.channel.reachable_peers();
                if peers > 0 {
                    return peers;
                }
            }
        };

        match tokio::time::timeout(wait, poll).await {
            Ok(peers) => {
                debug!(peers, "peer reachable");
                Ok(peers)
            }
            Err(_) => {
                warn!(?wait, "no peer reachable, abandoning connect");
                Err(SkyError::ConnectivityUnavailable)
            }
        }
    }

    /// Companion → primary refresh request
    pub fn request_refresh(&self) -> SkyResult<usize> {
        let peers = self.channel.send(&Message::empty(PATH_REQUEST_FETCH))?;
        debug!(peers, "refresh requested");
        Ok(peers)
    }

    /// Primary → companion snapshot
    pub fn publish_snapshot(&self, snapshot: Record) -> SkyResult<usize> {
        let entries = snapshot.get_list(KEY_WEATHER_LIST).map_or(0, |l| l.len());
        let peers = self
            .channel
            .send(&Message::with_record(PATH_DATA_WEATHER, snapshot))?;
        info!(entries, peers, "forecast snapshot published");
        Ok(peers)
    }

    /// Merge an inbound `/data/weather` message into the store and decode
    /// the resulting record
    pub fn ingest_weather(&self, message: &Message) -> SkyResult<Snapshot> {
        let merged = self.store.merge_write(PATH_DATA_WEATHER, &message.record())?;
        Ok(Snapshot::decode(&merged))
    }

    /// Replicate a local area choice
    pub fn select_area(&self, area: AreaId) -> SkyResult<()> {
        self.store
            .merge_write(PATH_DATA_AREA, &AreaSelection::to_record(area))?;
        info!(%area, "area selection written");
        Ok(())
    }

    /// Decode a `/data/weather` record. A missing or malformed entry list is
    /// replaced by an empty one and the corrected record is persisted.
    pub fn recover_weather(&self, mut record: Record) -> SkyResult<Snapshot> {
        if record.get_list(KEY_WEATHER_LIST).is_none() {
            if record.contains_key(KEY_WEATHER_LIST) {
                warn!(path = PATH_DATA_WEATHER, key = KEY_WEATHER_LIST, "malformed record, resetting");
            } else {
                debug!(path = PATH_DATA_WEATHER, "no forecast list stored, defaulting");
            }
            record.put_list(KEY_WEATHER_LIST, Vec::new());
            self.store.put(PATH_DATA_WEATHER, record.clone())?;
        }
        Ok(Snapshot::decode(&record))
    }

    /// Decode a `/data/area` record. A missing or malformed area becomes
    /// `default_area` and the corrected record is persisted.
    pub fn recover_area(&self, mut record: Record, default_area: AreaId) -> SkyResult<AreaId> {
        if let Some(area) = AreaSelection::from_record(&record) {
            return Ok(area);
        }
        if record.contains_key(KEY_WEATHER_AREA) {
            warn!(path = PATH_DATA_AREA, key = KEY_WEATHER_AREA, "malformed record, resetting");
        } else {
            debug!(path = PATH_DATA_AREA, "no area stored, defaulting");
        }
        record.put_int(KEY_WEATHER_AREA, default_area.get() as i64);
        self.store.put(PATH_DATA_AREA, record)?;
        Ok(default_area)
    }

    /// Stored snapshot, recovered when malformed
    pub fn read_weather(&self) -> SkyResult<Snapshot> {
        self.recover_weather(self.store.fetch(PATH_DATA_WEATHER)?)
    }

    /// Stored area, recovered to `default_area` when missing or malformed
    pub fn read_area(&self, default_area: AreaId) -> SkyResult<AreaId> {
        self.recover_area(self.store.fetch(PATH_DATA_AREA)?, default_area)
    }

    /// First-run defaulting of both replicated paths
    pub fn initialize_defaults(&self, default_area: AreaId) -> SkyResult<(Snapshot, AreaId)> {
        let snapshot = self.read_weather()?;
        let area = self.read_area(default_area)?;
        Ok((snapshot, area))
    }

    /// Release the store subscription
    pub fn teardown(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.store.unsubscribe(id);
            debug!("store subscription released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyclock_state::MemoryStore;
    use skyclock_transport::PeerLink;

    #[test]
    fn test_initialize_defaults_persists() {
        let store = MemoryStore::new();
        let (a, _b) = PeerLink::pair();
        let protocol = SyncProtocol::new(store.clone(), a.link);

        let (snapshot, area) = protocol.initialize_defaults(AreaId::NONE).unwrap();

        assert!(snapshot.present);
        assert!(snapshot.entries.is_empty());
        assert_eq!(area, AreaId::NONE);
        assert_eq!(store.fetch(PATH_DATA_WEATHER).unwrap().get_list(KEY_WEATHER_LIST).unwrap().len(), 0);
        assert_eq!(store.fetch(PATH_DATA_AREA).unwrap().get_int(KEY_WEATHER_AREA), Some(0));
    }

    #[test]
    fn test_initialize_defaults_keeps_existing() {
        let store = MemoryStore::new();
        store
            .put(PATH_DATA_AREA, Record::new().with_int(KEY_WEATHER_AREA, 4).with_int("other", 1))
            .unwrap();
        let (a, _b) = PeerLink::pair();
        let protocol = SyncProtocol::new(store.clone(), a.link);

        let (_, area) = protocol.initialize_defaults(AreaId::NONE).unwrap();
        assert_eq!(area, AreaId::new(4));
        assert_eq!(store.fetch(PATH_DATA_AREA).unwrap().get_int("other"), Some(1));
    }

    #[test]
    fn test_malformed_area_reset() {
        let store = MemoryStore::new();
        let mut bad = Record::new();
        bad.put_text(KEY_WEATHER_AREA, "north");
        store.put(PATH_DATA_AREA, bad).unwrap();
        let (a, _b) = PeerLink::pair();
        let protocol = SyncProtocol::new(store.clone(), a.link);

        let (_, area) = protocol.initialize_defaults(AreaId::new(2)).unwrap();
        assert_eq!(area, AreaId::new(2));
        assert_eq!(protocol.read_area(AreaId::NONE).unwrap(), AreaId::new(2));
    }

    #[test]
    fn test_read_weather_repairs_wrong_type() {
        let store = MemoryStore::new();
        store
            .put(PATH_DATA_WEATHER, Record::new().with_int(KEY_WEATHER_LIST, 3).with_int("local", 1))
            .unwrap();
        let (a, _b) = PeerLink::pair();
        let protocol = SyncProtocol::new(store.clone(), a.link);

        let snapshot = protocol.read_weather().unwrap();

        assert!(snapshot.present);
        let stored = store.fetch(PATH_DATA_WEATHER).unwrap();
        assert_eq!(stored.get_list(KEY_WEATHER_LIST).map(|l| l.len()), Some(0));
        assert_eq!(stored.get_int("local"), Some(1));
    }

    #[test]
    fn test_recover_area_persists_default() {
        let store = MemoryStore::new();
        let (a, _b) = PeerLink::pair();
        let protocol = SyncProtocol::new(store.clone(), a.link);
        let mut sub = store.subscribe();

        let mut bad = Record::new();
        bad.put_text(KEY_WEATHER_AREA, "north");
        assert_eq!(protocol.recover_area(bad, AreaId::NONE).unwrap(), AreaId::NONE);

        let change = sub.try_recv().unwrap();
        assert_eq!(change.path, PATH_DATA_AREA);
        assert_eq!(change.record.get_int(KEY_WEATHER_AREA), Some(0));

        let good = Record::new().with_int(KEY_WEATHER_AREA, 6);
        assert_eq!(protocol.recover_area(good, AreaId::NONE).unwrap(), AreaId::new(6));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_request_refresh_unreachable() {
        let (a, _b) = PeerLink::pair();
        a.link.set_reachable(false);
        let protocol = SyncProtocol::new(MemoryStore::new(), a.link);

        let err = protocol.request_refresh().unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_ingest_merges_onto_store_record() {
        let store = MemoryStore::new();
        store
            .put(PATH_DATA_WEATHER, Record::new().with_int("local", 1))
            .unwrap();
        let (a, _b) = PeerLink::pair();
        let protocol = SyncProtocol::new(store.clone(), a.link);

        let message = Message::with_record(
            PATH_DATA_WEATHER,
            Record::new().with_list(KEY_WEATHER_LIST, vec![]),
        );
        let snapshot = protocol.ingest_weather(&message).unwrap();

        assert!(snapshot.present);
        assert_eq!(store.fetch(PATH_DATA_WEATHER).unwrap().get_int("local"), Some(1));
    }

    #[test]
    fn test_teardown_unsubscribes() {
        let store = MemoryStore::new();
        let (a, _b) = PeerLink::pair();
        let mut protocol = SyncProtocol::new(store.clone(), a.link);

        let _sub = protocol.subscribe();
        let _sub2 = protocol.subscribe();
        assert_eq!(store.subscriber_count(), 1);

        protocol.teardown();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_connected_times_out() {
        let (a, _b) = PeerLink::pair();
        a.link.set_reachable(false);
        let protocol = SyncProtocol::new(MemoryStore::new(), a.link);

        let result = protocol.ensure_connected(Duration::from_secs(30)).await;
        assert!(matches!(result, Err(SkyError::ConnectivityUnavailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_connected_waits_for_peer() {
        let (a, _b) = PeerLink::pair();
        a.link.set_reachable(false);
        let switch = a.link.clone();
        let protocol = SyncProtocol::new(MemoryStore::new(), a.link);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            switch.set_reachable(true);
        });

        assert_eq!(protocol.ensure_connected(Duration::from_secs(30)).await.unwrap(), 1);
    }
}
