//! Message channels
//!
//! Delivery is at-most-once: a message may be dropped and nothing is
//! acknowledged. Senders retry on their own cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use skyclock_core::{SkyError, SkyResult};
use skyclock_wire::Message;

/// Inbound message receiver
pub type MessageReceiver = mpsc::UnboundedReceiver<Message>;

/// Send side of a connection to the remote role
pub trait MessageChannel: Send + Sync {
    /// Number of peers currently reachable
    fn reachable_peers(&self) -> usize;

    /// Send to every reachable peer. Returns the number of peers the message
    /// was handed to, or `ConnectivityUnavailable` when there were none.
    fn send(&self, message: &Message) -> SkyResult<usize>;
}

impl<C: MessageChannel + ?Sized> MessageChannel for Arc<C> {
    fn reachable_peers(&self) -> usize {
        (**self).reachable_peers()
    }

    fn send(&self, message: &Message) -> SkyResult<usize> {
        (**self).send(message)
    }
}

/// One end of an in-process link
pub struct LinkEnd {
    pub link: PeerLink,
    pub inbox: MessageReceiver,
}

/// In-process link to a single peer
#[derive(Clone)]
pub struct PeerLink {
    tx: mpsc::UnboundedSender<Message>,
    reachable: Arc<AtomicBool>,
}

impl PeerLink {
    /// Create a connected pair. Both ends share one reachability switch.
    pub fn pair() -> (LinkEnd, LinkEnd) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let reachable = Arc::new(AtomicBool::new(true));

        let a = LinkEnd {
            link: PeerLink {
                tx: b_tx,
                reachable: Arc::clone(&reachable),
            },
            inbox: a_rx,
        };
        let b = LinkEnd {
            link: PeerLink { tx: a_tx, reachable },
            inbox: b_rx,
        };
        (a, b)
    }

    /// Connect or disconnect the link (both directions)
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst) && !self.tx.is_closed()
    }
}

impl MessageChannel for PeerLink {
    fn reachable_peers(&self) -> usize {
        usize::from(self.is_reachable())
    }

    fn send(&self, message: &Message) -> SkyResult<usize> {
        if !self.is_reachable() {
            return Err(SkyError::ConnectivityUnavailable);
        }
        self.tx
            .send(message.clone())
            .map_err(|_| SkyError::ConnectivityUnavailable)?;
        trace!(path = %message.path, "link send");
        Ok(1)
    }
}
