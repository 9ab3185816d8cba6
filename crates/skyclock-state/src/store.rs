//! Replicated key/value store
//!
//! Records live at logical paths. Writers either replace a record (`put`) or
//! overlay a partial one (`merge_write`); every write is broadcast to
//! subscribers in write order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use skyclock_core::{Record, SkyError, SkyResult};

/// Subscription handle id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A write observed by a subscriber
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreChange {
    pub path: String,
    /// Record as stored after the write
    pub record: Record,
}

/// Receiving end of a store subscription
pub struct StoreSubscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<StoreChange>,
}

impl StoreSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next change, waiting until one arrives. `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<StoreChange> {
        self.rx.recv().await
    }

    /// Next change if one is queued
    pub fn try_recv(&mut self) -> Option<StoreChange> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued change
    pub fn drain(&mut self) -> Vec<StoreChange> {
        let mut changes = Vec::new();
        while let Some(change) = self.try_recv() {
            changes.push(change);
        }
        changes
    }
}

/// Fetch / merge-write / put contract over path-addressed records
pub trait SyncStore: Send + Sync {
    /// Record at `path`, empty when nothing was stored
    fn fetch(&self, path: &str) -> SkyResult<Record>;

    /// Overlay `partial` onto the stored record and persist the union
    fn merge_write(&self, path: &str, partial: &Record) -> SkyResult<Record>;

    /// Replace the record at `path`
    fn put(&self, path: &str, record: Record) -> SkyResult<()>;

    fn subscribe(&self) -> StoreSubscription;

    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, Record>,
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<StoreChange>)>,
    next_subscription: u64,
    offline: bool,
}

impl StoreInner {
    fn check_online(&self) -> SkyResult<()> {
        if self.offline {
            Err(SkyError::Store("store offline".into()))
        } else {
            Ok(())
        }
    }

    fn commit(&mut self, path: &str, record: Record) {
        self.records.insert(path.to_string(), record.clone());

        let change = StoreChange {
            path: path.to_string(),
            record,
        };
        // Closed receivers are pruned on the way
        self.subscribers
            .retain(|(_, tx)| tx.send(change.clone()).is_ok());
        trace!(path, subscribers = self.subscribers.len(), "store commit");
    }
}

/// In-process store. Clones share one keyspace, standing in for the
/// replicated data layer between devices.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Make every operation fail with `SkyError::Store` while set
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Paths currently holding a record
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.inner.lock().records.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl SyncStore for MemoryStore {
    fn fetch(&self, path: &str) -> SkyResult<Record> {
        let inner = self.inner.lock();
        inner.check_online()?;
        Ok(inner.records.get(path).cloned().unwrap_or_default())
    }

    fn merge_write(&self, path: &str, partial: &Record) -> SkyResult<Record> {
        let mut inner = self.inner.lock();
        inner.check_online()?;

        let merged = inner
            .records
            .get(path)
            .map(|old| old.merged(partial))
            .unwrap_or_else(|| partial.clone());
        debug!(path, keys = partial.len(), "merge write");
        inner.commit(path, merged.clone());
        Ok(merged)
    }

    fn put(&self, path: &str, record: Record) -> SkyResult<()> {
        let mut inner = self.inner.lock();
        inner.check_online()?;
        debug!(path, keys = record.len(), "put");
        inner.commit(path, record);
        Ok(())
    }

    fn subscribe(&self) -> StoreSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, tx));
        StoreSubscription { id, rx }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscribers.retain(|(sid, _)| *sid != id);
    }
}
