//! Ease-out animation progress
//!
//! Drives the hand sweep played when the face becomes visible. Progress runs
//! for `duration_ms` and is sampled at fixed frame intervals.

use crate::Cadence;

/// Default animation length
pub const ANIMATION_DURATION_MS: i64 = 500;
/// Default frame interval (30 Hz)
pub const ANIMATION_FRAME_MS: i64 = 1000 / 30;

/// Ease-out curve, `t * (2 - t)`
#[inline]
pub fn ease_out(t: f64) -> f64 {
    t * (2.0 - t)
}

/// A single running animation
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    duration_ms: i64,
    frame_ms: i64,
    started_at: Option<i64>,
    value: f64,
}

impl Animation {
    pub fn new(duration_ms: i64, frame_ms: i64) -> Self {
        Animation {
            duration_ms: duration_ms.max(1),
            frame_ms: frame_ms.max(1),
            started_at: None,
            value: 1.0,
        }
    }

    /// Restart from zero at `now`
    pub fn start(&mut self, now: i64) {
        self.started_at = Some(now);
        self.value = 0.0;
    }

    /// Stop and snap to the final value
    pub fn reset(&mut self) {
        self.started_at = None;
        self.value = 1.0;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Current eased value in `[0, 1]`
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Sample the animation at `now`.
    ///
    /// Returns the cadence for the next frame, or `None` once progress reaches
    /// 1 and the animation retires.
    pub fn advance(&mut self, now: i64) -> Option<Cadence> {
        let started_at = self.started_at?;
        let t = (now - started_at) as f64 / self.duration_ms as f64;
        if t >= 1.0 {
            self.reset();
            return None;
        }
        self.value = ease_out(t.max(0.0));
        Some(Cadence::frame(self.frame_ms, started_at))
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(ANIMATION_DURATION_MS, ANIMATION_FRAME_MS)
    }
}
