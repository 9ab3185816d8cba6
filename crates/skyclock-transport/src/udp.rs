//! UDP channel
//!
//! One datagram carries one message frame. The peer list is fixed at
//! construction; every listed peer counts as reachable.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use skyclock_core::{SkyError, SkyResult};
use skyclock_wire::{Message, MAX_FRAME_SIZE};

use crate::{MessageChannel, MessageReceiver};

/// UDP message channel
pub struct UdpChannel {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    peers: Vec<SocketAddr>,
    runtime: Handle,
}

impl UdpChannel {
    /// Bind to a local address. Must be called inside a tokio runtime.
    pub async fn bind(addr: SocketAddr, peers: Vec<SocketAddr>) -> SkyResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| SkyError::Transport(e.to_string()))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| SkyError::Transport(e.to_string()))?;

        Ok(UdpChannel {
            socket: Arc::new(socket),
            local_addr,
            peers,
            runtime: Handle::current(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    pub fn add_peer(&mut self, peer: SocketAddr) {
        if !self.peers.contains(&peer) {
            self.peers.push(peer);
        }
    }

    /// Send one frame and wait for the socket to accept it
    pub async fn send_to(&self, message: &Message, dest: SocketAddr) -> SkyResult<()> {
        let bytes = message.serialize()?;
        self.socket
            .send_to(&bytes, dest)
            .await
            .map_err(|e| SkyError::Transport(e.to_string()))?;
        Ok(())
    }

    /// Start a background loop decoding inbound frames
    pub fn start_receive_loop(&self) -> MessageReceiver {
        start_receive_loop(Arc::clone(&self.socket))
    }
}

impl MessageChannel for UdpChannel {
    fn reachable_peers(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, message: &Message) -> SkyResult<usize> {
        if self.peers.is_empty() {
            return Err(SkyError::ConnectivityUnavailable);
        }

        let bytes = Arc::new(message.serialize()?);
        for &peer in &self.peers {
            let socket = Arc::clone(&self.socket);
            let bytes = Arc::clone(&bytes);
            self.runtime.spawn(async move {
                if let Err(e) = socket.send_to(&bytes, peer).await {
                    warn!(%peer, error = %e, "UDP send failed");
                }
            });
        }
        debug!(path = %message.path, peers = self.peers.len(), "UDP send queued");
        Ok(self.peers.len())
    }
}

/// Start a background receive loop on `socket`.
/// Undecodable datagrams are logged and dropped.
pub fn start_receive_loop(socket: Arc<UdpSocket>) -> MessageReceiver {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_FRAME_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => match Message::parse(&buf[..len]) {
                    Ok(message) => {
                        if tx.send(message).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => {
                        warn!(%addr, error = %e, "dropping undecodable datagram");
                    }
                },
                Err(e) => {
                    warn!("UDP receive error: {}", e);
                }
            }
        }
    });

    rx
}
