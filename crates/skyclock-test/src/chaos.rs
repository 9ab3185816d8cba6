//! Lossy message channel
//!
//! Wraps a real channel and drops or duplicates messages:
//! - Random loss
//! - Burst loss
//! - Duplication
//!
//! Dropped messages still report success to the sender, as a real radio
//! link would.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use skyclock_core::SkyResult;
use skyclock_transport::MessageChannel;
use skyclock_wire::Message;

/// Link chaos configuration
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    /// Message loss rate (0.0 - 1.0)
    pub loss_rate: f64,
    /// Probability that a loss burst starts
    pub burst_loss_prob: f64,
    /// Burst loss length range
    pub burst_length: (u32, u32),
    /// Duplicate probability
    pub duplicate_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            loss_rate: 0.01,
            burst_loss_prob: 0.05,
            burst_length: (2, 5),
            duplicate_prob: 0.01,
        }
    }
}

impl ChaosConfig {
    /// Perfect link
    pub fn lossless() -> Self {
        ChaosConfig {
            loss_rate: 0.0,
            burst_loss_prob: 0.0,
            burst_length: (0, 0),
            duplicate_prob: 0.0,
        }
    }

    /// Good link
    pub fn good() -> Self {
        ChaosConfig {
            loss_rate: 0.001,
            burst_loss_prob: 0.01,
            burst_length: (1, 2),
            duplicate_prob: 0.001,
        }
    }

    /// Poor link (watch at the edge of radio range)
    pub fn poor() -> Self {
        ChaosConfig {
            loss_rate: 0.1,
            burst_loss_prob: 0.1,
            burst_length: (2, 6),
            duplicate_prob: 0.02,
        }
    }

    /// Hostile link
    pub fn hostile() -> Self {
        ChaosConfig {
            loss_rate: 0.3,
            burst_loss_prob: 0.2,
            burst_length: (3, 10),
            duplicate_prob: 0.05,
        }
    }
}

/// Chaos statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChaosStats {
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub messages_lost: u64,
    pub messages_duplicated: u64,
}

impl ChaosStats {
    pub fn loss_rate(&self) -> f64 {
        if self.messages_sent == 0 {
            0.0
        } else {
            self.messages_lost as f64 / self.messages_sent as f64
        }
    }
}

struct ChaosState {
    rng: StdRng,
    burst_remaining: u32,
    stats: ChaosStats,
}

/// Channel wrapper applying `ChaosConfig`
pub struct LossyChannel<C: MessageChannel> {
    inner: C,
    config: ChaosConfig,
    state: Mutex<ChaosState>,
}

impl<C: MessageChannel> LossyChannel<C> {
    /// Create a lossy channel with seed
    pub fn new(inner: C, config: ChaosConfig, seed: u64) -> Self {
        LossyChannel {
            inner,
            config,
            state: Mutex::new(ChaosState {
                rng: StdRng::seed_from_u64(seed),
                burst_remaining: 0,
                stats: ChaosStats::default(),
            }),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn stats(&self) -> ChaosStats {
        self.state.lock().stats.clone()
    }

    pub fn set_config(&mut self, config: ChaosConfig) {
        self.config = config;
    }
}

impl ChaosState {
    fn should_drop(&mut self, config: &ChaosConfig) -> bool {
        // Burst loss
        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return true;
        }

        // Start new burst?
        if self.rng.gen::<f64>() < config.burst_loss_prob {
            let (min, max) = config.burst_length;
            self.burst_remaining = self.rng.gen_range(min..=max.max(min));
            return true;
        }

        // Random loss
        self.rng.gen::<f64>() < config.loss_rate
    }
}

impl<C: MessageChannel> MessageChannel for LossyChannel<C> {
    fn reachable_peers(&self) -> usize {
        self.inner.reachable_peers()
    }

    fn send(&self, message: &Message) -> SkyResult<usize> {
        let peers = self.inner.reachable_peers();
        if peers == 0 {
            // Let the inner channel report the connectivity error
            return self.inner.send(message);
        }

        let (drop_it, duplicate) = {
            let mut state = self.state.lock();
            state.stats.messages_sent += 1;
            let drop_it = state.should_drop(&self.config);
            let duplicate = !drop_it && state.rng.gen::<f64>() < self.config.duplicate_prob;
            if drop_it {
                state.stats.messages_lost += 1;
            } else {
                state.stats.messages_delivered += 1;
            }
            if duplicate {
                state.stats.messages_duplicated += 1;
            }
            (drop_it, duplicate)
        };

        if drop_it {
            trace!(path = %message.path, "chaos dropped message");
            return Ok(peers);
        }

        let sent = self.inner.send(message)?;
        if duplicate {
            self.inner.send(message)?;
        }
        Ok(sent)
    }
}
