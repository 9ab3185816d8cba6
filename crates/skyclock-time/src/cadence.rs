//! Tick cadences
//!
//! A cadence turns "now" into the wall instant of the next tick. Aligned
//! cadences are re-derived from wall-clock modulo arithmetic on every arm, so a
//! late handler never accumulates drift.

/// How the next fire instant of a tick is derived
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cadence {
    /// Next wall instant with `wall % period_ms == 0`, strictly after now
    Aligned { period_ms: i64 },
    /// `parts` children of `ceil(period_ms / parts)` inside each parent period.
    /// The last child is shortened so it never crosses the parent boundary.
    Subdivided { period_ms: i64, parts: i64 },
    /// Fixed interval measured from `origin_ms` (an animation start)
    Frame { interval_ms: i64, origin_ms: i64 },
    /// Fire at `now`
    Immediate,
}

impl Cadence {
    pub fn aligned(period_ms: i64) -> Self {
        Cadence::Aligned { period_ms }
    }

    pub fn subdivided(period_ms: i64, parts: i64) -> Self {
        Cadence::Subdivided { period_ms, parts }
    }

    pub fn frame(interval_ms: i64, origin_ms: i64) -> Self {
        Cadence::Frame {
            interval_ms,
            origin_ms,
        }
    }

    /// Delay from `now` to the next fire, in wall ms
    pub fn delay_from(&self, now: i64) -> i64 {
        match *self {
            Cadence::Aligned { period_ms } => {
                let period = period_ms.max(1);
                period - now.rem_euclid(period)
            }
            Cadence::Subdivided { period_ms, parts } => {
                let period = period_ms.max(1);
                let child = child_len(period, parts);
                let offset = now.rem_euclid(period);
                (child - offset % child).min(period - offset)
            }
            Cadence::Frame {
                interval_ms,
                origin_ms,
            } => {
                let interval = interval_ms.max(1);
                interval - (now - origin_ms).rem_euclid(interval)
            }
            Cadence::Immediate => 0,
        }
    }

    /// Wall instant of the next fire
    pub fn next_fire(&self, now: i64) -> i64 {
        now + self.delay_from(now)
    }
}

#[inline]
fn child_len(period: i64, parts: i64) -> i64 {
    let parts = parts.max(1);
    (period + parts - 1) / parts
}
