//! Runtime configuration
//!
//! Loaded from JSON. Every field is optional and falls back to the default
//! cadence the watch face ships with.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use skyclock_core::{AreaId, SkyError, SkyResult};
use skyclock_state::FULL_SNAPSHOT_LEN;
use skyclock_time::{
    Animation, Cadence, DisplayMode, RefreshPolicy, SchedulerConfig, ANIMATION_DURATION_MS,
    ANIMATION_FRAME_MS, WINDOW_IN_WALL_MS, WORLD_HOUR_IN_WALL_MS,
};

/// How the world-hour tick is aligned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldHourCadence {
    /// Once per world hour (analog face)
    #[default]
    Aligned,
    /// Three children per 8750 ms parent (digital readout, world minutes)
    Subdivided,
}

/// Display mode at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialMode {
    #[default]
    Interactive,
    Ambient,
    Hidden,
}

impl From<InitialMode> for DisplayMode {
    fn from(mode: InitialMode) -> Self {
        match mode {
            InitialMode::Interactive => DisplayMode::Interactive,
            InitialMode::Ambient => DisplayMode::Ambient,
            InitialMode::Hidden => DisplayMode::Hidden,
        }
    }
}

/// Role runtime configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Refresh period while data is incomplete or stale (wall ms)
    pub refresh_short_ms: i64,
    /// Refresh period once the current window is confirmed (wall ms)
    pub refresh_long_ms: i64,
    /// Bounded wait for a reachable peer
    pub connect_timeout_ms: u64,
    /// Entries in a full snapshot
    pub expected_snapshot_len: usize,
    pub animation_duration_ms: i64,
    pub animation_frame_ms: i64,
    pub world_hour_cadence: WorldHourCadence,
    pub initial_mode: InitialMode,
    /// Area written on first run when none is stored
    pub default_area: i32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            refresh_short_ms: 60_000,
            refresh_long_ms: WINDOW_IN_WALL_MS,
            connect_timeout_ms: 30_000,
            expected_snapshot_len: FULL_SNAPSHOT_LEN,
            animation_duration_ms: ANIMATION_DURATION_MS,
            animation_frame_ms: ANIMATION_FRAME_MS,
            world_hour_cadence: WorldHourCadence::Aligned,
            initial_mode: InitialMode::Interactive,
            default_area: AreaId::NONE.get(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> SkyResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SkyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_path(path: &Path) -> SkyResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SkyError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> SkyResult<()> {
        let positive = [
            ("refresh_short_ms", self.refresh_short_ms),
            ("refresh_long_ms", self.refresh_long_ms),
            ("animation_duration_ms", self.animation_duration_ms),
            ("animation_frame_ms", self.animation_frame_ms),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(SkyError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.expected_snapshot_len == 0 {
            return Err(SkyError::Config("expected_snapshot_len must be positive".into()));
        }
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        let base = match self.world_hour_cadence {
            WorldHourCadence::Aligned => SchedulerConfig::default(),
            WorldHourCadence::Subdivided => SchedulerConfig::digital(),
        };
        SchedulerConfig {
            frame_interval_ms: self.animation_frame_ms,
            refresh: Cadence::aligned(self.refresh_short_ms),
            ambient: Cadence::aligned(WORLD_HOUR_IN_WALL_MS),
            ..base
        }
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::new(self.refresh_short_ms, self.refresh_long_ms)
    }

    pub fn animation(&self) -> Animation {
        Animation::new(self.animation_duration_ms, self.animation_frame_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn initial_mode(&self) -> DisplayMode {
        self.initial_mode.into()
    }

    pub fn default_area(&self) -> AreaId {
        AreaId::new(self.default_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.refresh_long_ms, 1_400_000);
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.expected_snapshot_len, 120);
        assert_eq!(config.scheduler_config(), SchedulerConfig::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json_str(
            r#"{ "refresh_short_ms": 5000, "world_hour_cadence": "subdivided", "initial_mode": "ambient" }"#,
        )
        .unwrap();

        assert_eq!(config.refresh_short_ms, 5000);
        assert_eq!(config.refresh_long_ms, 1_400_000);
        assert_eq!(config.initial_mode(), DisplayMode::Ambient);
        assert_eq!(
            config.scheduler_config().world_hour,
            Cadence::subdivided(8750, 3)
        );
        assert_eq!(config.scheduler_config().refresh, Cadence::aligned(5000));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RuntimeConfig::from_json_str(r#"{ "animation_frame_ms": 0 }"#),
            Err(SkyError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json_str("not json"),
            Err(SkyError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = RuntimeConfig::from_path(Path::new("/nonexistent/skyclock.json"));
        assert!(matches!(result, Err(SkyError::Config(_))));
    }
}
