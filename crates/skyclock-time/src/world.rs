//! World clock - wall time to world time conversion
//!
//! World time runs `RATE = 3600/175` times faster than wall time: one world
//! hour lasts 175 wall seconds, one world day 70 wall minutes. The calendar is
//! synthetic (32-day months, 12-month years), not Gregorian.

use std::fmt;

/// Rate numerator (world ms per `RATE_DENOMINATOR` wall ms)
pub const RATE_NUMERATOR: i64 = 3600;
/// Rate denominator
pub const RATE_DENOMINATOR: i64 = 175;
/// World milliseconds per wall millisecond
pub const RATE: f64 = RATE_NUMERATOR as f64 / RATE_DENOMINATOR as f64;

pub const SECOND_IN_MILLIS: i64 = 1000;
pub const MINUTE_IN_SECOND: i64 = 60;
pub const HOUR_IN_MINUTE: i64 = 60;
pub const DAY_IN_HOUR: i64 = 24;
pub const MONTH_IN_DAY: i64 = 32;
pub const YEAR_IN_MONTH: i64 = 12;

pub const MINUTE_IN_MILLIS: i64 = SECOND_IN_MILLIS * MINUTE_IN_SECOND;
pub const HOUR_IN_MILLIS: i64 = MINUTE_IN_MILLIS * HOUR_IN_MINUTE;
pub const DAY_IN_MILLIS: i64 = HOUR_IN_MILLIS * DAY_IN_HOUR;
pub const MONTH_IN_MILLIS: i64 = DAY_IN_MILLIS * MONTH_IN_DAY;
pub const YEAR_IN_MILLIS: i64 = MONTH_IN_MILLIS * YEAR_IN_MONTH;

/// World hours per forecast window
pub const WINDOW_HOURS: i64 = 8;
/// Forecast window length in world ms
pub const WINDOW_IN_MILLIS: i64 = HOUR_IN_MILLIS * WINDOW_HOURS;

/// One world hour in wall ms (175 000)
pub const WORLD_HOUR_IN_WALL_MS: i64 = HOUR_IN_MILLIS * RATE_DENOMINATOR / RATE_NUMERATOR;
/// One forecast window in wall ms (1 400 000)
pub const WINDOW_IN_WALL_MS: i64 = WORLD_HOUR_IN_WALL_MS * WINDOW_HOURS;
/// One world day in wall ms (4 200 000, i.e. 70 minutes)
pub const WORLD_DAY_IN_WALL_MS: i64 = WORLD_HOUR_IN_WALL_MS * DAY_IN_HOUR;

/// A point in world time with its calendar decomposition
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldInstant {
    wall_millis: f64,
    world_millis: f64,
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

/// Stateless wall → world conversions
pub struct WorldClock;

impl WorldClock {
    /// Convert a wall-clock instant (ms since UNIX epoch) to world time
    pub fn to_world(wall_millis: f64) -> WorldInstant {
        // Multiply before dividing so integral wall ms convert exactly
        let world_millis = wall_millis * RATE_NUMERATOR as f64 / RATE_DENOMINATOR as f64;
        WorldInstant::build(wall_millis, world_millis)
    }

    /// Convert an integral wall-clock instant
    pub fn to_world_ms(wall_millis: i64) -> WorldInstant {
        Self::to_world(wall_millis as f64)
    }

    /// Most recent 8-world-hour boundary at or before `instant`
    pub fn window_start(instant: &WorldInstant) -> WorldInstant {
        instant.window_start()
    }

    /// Canonical `"YYYY-MM-DD-HH"` id of `instant`
    pub fn time_id(instant: &WorldInstant) -> String {
        instant.time_id()
    }
}

impl WorldInstant {
    /// Build from a world-ms value (inverse of `WorldClock::to_world`)
    pub fn from_world_millis(world_millis: f64) -> Self {
        let wall_millis = world_millis * RATE_DENOMINATOR as f64 / RATE_NUMERATOR as f64;
        WorldInstant::build(wall_millis, world_millis)
    }

    fn build(wall_millis: f64, world_millis: f64) -> Self {
        WorldInstant {
            wall_millis,
            world_millis,
            year: floor_units(world_millis, YEAR_IN_MILLIS),
            month: floor_units(world_millis, MONTH_IN_MILLIS).rem_euclid(YEAR_IN_MONTH) as u32,
            day: floor_units(world_millis, DAY_IN_MILLIS).rem_euclid(MONTH_IN_DAY) as u32,
            hour: floor_units(world_millis, HOUR_IN_MILLIS).rem_euclid(DAY_IN_HOUR) as u32,
            minute: floor_units(world_millis, MINUTE_IN_MILLIS).rem_euclid(HOUR_IN_MINUTE) as u32,
            second: floor_units(world_millis, SECOND_IN_MILLIS).rem_euclid(MINUTE_IN_SECOND)
                as u32,
        }
    }

    #[inline]
    pub fn wall_millis(&self) -> f64 {
        self.wall_millis
    }

    #[inline]
    pub fn world_millis(&self) -> f64 {
        self.world_millis
    }

    #[inline]
    pub fn year(&self) -> i64 {
        self.year
    }

    /// Month, 0-11
    #[inline]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Day of month, 0-31
    #[inline]
    pub fn day(&self) -> u32 {
        self.day
    }

    #[inline]
    pub fn hour(&self) -> u32 {
        self.hour
    }

    #[inline]
    pub fn minute(&self) -> u32 {
        self.minute
    }

    #[inline]
    pub fn second(&self) -> u32 {
        self.second
    }

    /// Snap back to the most recent 8-world-hour boundary.
    /// An instant exactly on a boundary is returned unchanged.
    pub fn window_start(&self) -> WorldInstant {
        // Days hold exactly three windows, so windows align on epoch multiples
        let windows = floor_units(self.world_millis, WINDOW_IN_MILLIS);
        WorldInstant::from_world_millis((windows * WINDOW_IN_MILLIS) as f64)
    }

    /// Window start `n` windows away from this instant's window (negative = back)
    pub fn offset_windows(&self, n: i64) -> WorldInstant {
        let start = self.window_start();
        WorldInstant::from_world_millis(start.world_millis + (WINDOW_IN_MILLIS * n) as f64)
    }

    /// Instant `n` world hours later (negative = earlier)
    pub fn offset_hours(&self, n: i64) -> WorldInstant {
        WorldInstant::from_world_millis(self.world_millis + (HOUR_IN_MILLIS * n) as f64)
    }

    /// Canonical per-hour id, `"{year}-{month:02}-{day:02}-{hour:02}"`
    pub fn time_id(&self) -> String {
        format_time_id(self.year, self.month, self.day, self.hour)
    }

    /// Whether two instants fall in the same forecast window
    pub fn same_window(&self, other: &WorldInstant) -> bool {
        self.window_start().time_id() == other.window_start().time_id()
    }
}

impl fmt::Display for WorldInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Format a canonical time id from world calendar fields
pub fn format_time_id(year: i64, month: u32, day: u32, hour: u32) -> String {
    format!("{}-{:02}-{:02}-{:02}", year, month, day, hour)
}

#[inline]
fn floor_units(world_millis: f64, unit: i64) -> i64 {
    (world_millis / unit as f64).floor() as i64
}
