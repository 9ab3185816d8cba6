//! Async role driver
//!
//! One loop per role. It sleeps until the role's next tick deadline and
//! otherwise forwards inbound messages, store changes and control events, so
//! every input reaches the role through `handle` in arrival order.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use skyclock_state::StoreSubscription;
use skyclock_time::{ScheduledTick, WallClock};
use skyclock_transport::MessageReceiver;

use crate::RoleEvent;

/// Event-driven role
pub trait Role {
    fn name(&self) -> &'static str;

    /// Load stored state and arm the initial ticks
    fn start(&mut self, now: i64);

    /// Handle one event. Never fails; errors are logged inside.
    fn handle(&mut self, event: RoleEvent, now: i64);

    /// Earliest pending tick, if any
    fn next_deadline(&self) -> Option<i64>;

    /// Fire every tick due at `now` and return them
    fn fire_due(&mut self, now: i64) -> Vec<ScheduledTick>;
}

/// Control sender for a running driver
pub type ControlSender = mpsc::UnboundedSender<RoleEvent>;
/// Control receiver consumed by the driver
pub type ControlReceiver = mpsc::UnboundedReceiver<RoleEvent>;

/// Inputs of one driver loop
pub struct RoleInputs {
    pub inbox: MessageReceiver,
    pub changes: StoreSubscription,
    pub control: ControlReceiver,
}

/// Driver counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub wakeups: u64,
    pub ticks_fired: u64,
    pub messages: u64,
    pub store_changes: u64,
    pub control_events: u64,
}

/// Run `role` until a `Shutdown` control event arrives or the control
/// channel closes
pub async fn run_role<R: Role, W: WallClock>(
    role: &mut R,
    clock: &W,
    mut inputs: RoleInputs,
) -> DriverStats {
    let mut stats = DriverStats::default();
    let mut inbox_open = true;
    let mut changes_open = true;

    role.start(clock.now_millis());
    info!(role = role.name(), "role started");

    loop {
        let deadline = role.next_deadline();
        let wait = deadline
            .map(|at| Duration::from_millis((at - clock.now_millis()).max(0) as u64))
            .unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = tokio::time::sleep(wait), if deadline.is_some() => {
                stats.wakeups += 1;
                let fired = role.fire_due(clock.now_millis());
                stats.ticks_fired += fired.len() as u64;
            }
            message = inputs.inbox.recv(), if inbox_open => match message {
                Some(message) => {
                    stats.messages += 1;
                    role.handle(RoleEvent::Message(message), clock.now_millis());
                }
                None => {
                    debug!(role = role.name(), "inbox closed");
                    inbox_open = false;
                }
            },
            change = inputs.changes.recv(), if changes_open => match change {
                Some(change) => {
                    stats.store_changes += 1;
                    role.handle(RoleEvent::StoreChanged(change), clock.now_millis());
                }
                None => changes_open = false,
            },
            control = inputs.control.recv() => {
                stats.control_events += 1;
                match control {
                    Some(RoleEvent::Shutdown) | None => {
                        role.handle(RoleEvent::Shutdown, clock.now_millis());
                        break;
                    }
                    Some(event) => role.handle(event, clock.now_millis()),
                }
            }
        }
    }

    info!(role = role.name(), ?stats, "role stopped");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyclock_core::{AreaId, PATH_DATA_WEATHER, PATH_REQUEST_FETCH};
    use skyclock_state::MemoryStore;
    use skyclock_time::{SystemWallClock, TickKind};
    use skyclock_transport::{MessageChannel, PeerLink};
    use skyclock_wire::Message;

    use crate::{Companion, Primary, RuntimeConfig, StaticProvider};

    #[tokio::test]
    async fn test_primary_driver_answers_and_stops() {
        let store = MemoryStore::new();
        let (a, mut b) = PeerLink::pair();
        let mut primary = Primary::new(&RuntimeConfig::default(), store.clone(), a.link, StaticProvider::new(2));
        let changes = primary.subscribe();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        b.link.send(&Message::empty(PATH_REQUEST_FETCH)).unwrap();

        let inputs = RoleInputs {
            inbox: a.inbox,
            changes,
            control: control_rx,
        };
        let handle = tokio::spawn(async move {
            let stats = run_role(&mut primary, &SystemWallClock, inputs).await;
            (stats, primary.stats().snapshots_sent)
        });

        let reply = tokio::time::timeout(Duration::from_secs(2), b.inbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.path, PATH_DATA_WEATHER);

        control_tx.send(RoleEvent::AreaSelected(AreaId::new(3))).unwrap();
        control_tx.send(RoleEvent::Shutdown).unwrap();
        let (stats, sent) = handle.await.unwrap();

        assert_eq!(sent, 1);
        assert_eq!(stats.messages, 1);
        assert_eq!(stats.control_events, 2);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_companion_driver_fires_ticks() {
        let store = MemoryStore::new();
        let (a, mut b) = PeerLink::pair();
        let mut companion = Companion::new(&RuntimeConfig::default(), store, a.link);
        let changes = companion.subscribe();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let inputs = RoleInputs {
            inbox: a.inbox,
            changes,
            control: control_rx,
        };
        let handle = tokio::spawn(async move {
            let stats = run_role(&mut companion, &SystemWallClock, inputs).await;
            (stats, companion.scheduler().is_armed(TickKind::Second))
        });

        // First refresh fires immediately on entering interactive mode
        let request = tokio::time::timeout(Duration::from_secs(5), b.inbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.path, PATH_REQUEST_FETCH);

        control_tx.send(RoleEvent::Shutdown).unwrap();
        let (stats, second_armed) = handle.await.unwrap();
        assert!(stats.ticks_fired >= 1);
        assert!(!second_armed);
    }
}
