//! Clock face read model
//!
//! The drawing-free values a renderer polls on every redraw:
//! - 24h world and local readouts (`"HH:--"` in ambient mode)
//! - The four forecast window ids visible from now
//! - The 20-tick world-hour ring starting at the most recent world-hour edge
//! - The sky gradient colour for an hour of the day

use crate::{DisplayMode, WorldClock, WorldInstant, HOUR_IN_MILLIS, WINDOW_HOURS, WORLD_HOUR_IN_WALL_MS};

/// Ticks drawn on the world-hour ring
pub const RING_TICKS: usize = 20;
/// Forecast windows shown ahead of now (including the current one)
pub const VISIBLE_WINDOWS: usize = 4;

const SKY_STOPS: [(f64, [u8; 3]); 7] = [
    (0.0, [0x50, 0x62, 0xa6]),
    (5.0 / 24.0, [0x33, 0x86, 0xbd]),
    (7.0 / 24.0, [0x43, 0xc2, 0xe8]),
    (0.5, [0xff, 0xe9, 0x8c]),
    (17.0 / 24.0, [0xe0, 0x9f, 0x57]),
    (19.0 / 24.0, [0xb3, 0x66, 0x79]),
    (1.0, [0x50, 0x62, 0xa6]),
];

/// One tick on the world-hour ring
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldTick {
    /// Position within the wall-clock hour dial, in wall ms
    pub offset_ms_in_wall_hour: i64,
    /// World hour the tick stands for
    pub hour: u32,
    /// Hour label, on the first tick and every window boundary
    pub label: Option<String>,
    /// Index into `ClockFace::window_ids` of the window the tick falls in
    pub window_index: usize,
}

/// Everything needed to draw one frame
#[derive(Clone, Debug)]
pub struct ClockFace {
    pub world: WorldInstant,
    pub world_readout: String,
    pub local_readout: String,
    pub window_ids: [String; VISIBLE_WINDOWS],
    pub ticks: Vec<WorldTick>,
    pub sky: [u8; 3],
}

impl ClockFace {
    /// Build the read model for `wall_millis`. Local time comes from the host
    /// (time zone handling stays outside this crate).
    pub fn at(wall_millis: i64, local_hour: u32, local_minute: u32, mode: DisplayMode) -> Self {
        let world = WorldClock::to_world_ms(wall_millis);
        let ambient = mode == DisplayMode::Ambient;

        let window_ids = [0i64, 1, 2, 3].map(|n| world.offset_windows(n).time_id());

        ClockFace {
            world_readout: readout(world.hour(), world.minute(), ambient),
            local_readout: readout(local_hour, local_minute, ambient),
            window_ids,
            ticks: ring_ticks(wall_millis, world.hour()),
            sky: sky_color(world.hour(), world.minute()),
            world,
        }
    }
}

fn readout(hour: u32, minute: u32, ambient: bool) -> String {
    if ambient {
        format!("{:02}:--", hour)
    } else {
        format!("{:02}:{:02}", hour, minute)
    }
}

/// Ring layout for the world hour `hour` current at `wall_millis`
pub fn ring_ticks(wall_millis: i64, hour: u32) -> Vec<WorldTick> {
    let prev_edge = wall_millis - wall_millis.rem_euclid(WORLD_HOUR_IN_WALL_MS);
    let start = prev_edge.rem_euclid(HOUR_IN_MILLIS);

    let mut window_index = 0;
    let mut ticks = Vec::with_capacity(RING_TICKS);
    for i in 0..RING_TICKS as u32 {
        let tick_hour = (hour + i) % 24;
        let label = if i == 0 || tick_hour as i64 % WINDOW_HOURS == 0 {
            Some(format!("{:02}", tick_hour))
        } else {
            None
        };
        ticks.push(WorldTick {
            offset_ms_in_wall_hour: (start + i as i64 * WORLD_HOUR_IN_WALL_MS)
                .rem_euclid(HOUR_IN_MILLIS),
            hour: tick_hour,
            label,
            window_index,
        });
        if (hour + i + 1) as i64 % WINDOW_HOURS == 0 {
            window_index += 1;
        }
    }
    ticks
}

/// Sky gradient colour for a time of day
pub fn sky_color(hour: u32, minute: u32) -> [u8; 3] {
    let pos = ((hour % 24) * 60 + minute.min(59)) as f64 / 1440.0;

    for pair in SKY_STOPS.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if pos <= p1 {
            let f = ((pos - p0) / (p1 - p0)).clamp(0.0, 1.0);
            let mut out = [0u8; 3];
            for ch in 0..3 {
                let a = c0[ch] as f64;
                let b = c1[ch] as f64;
                out[ch] = (a + (b - a) * f).round() as u8;
            }
            return out;
        }
    }
    SKY_STOPS[SKY_STOPS.len() - 1].1
}
