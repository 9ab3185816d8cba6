//! Forecast entries and the per-window forecast cache
//!
//! A snapshot on `/data/weather` carries one entry per (area, window). The
//! cache keeps the entries of the selected area only, keyed by the window's
//! canonical time id.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use skyclock_core::{
    AreaId, Record, SkyError, SkyResult, KEY_WEATHER_AREA, KEY_WEATHER_DAY, KEY_WEATHER_HOUR,
    KEY_WEATHER_ID, KEY_WEATHER_LIST, KEY_WEATHER_MONTH, KEY_WEATHER_YEAR, PATH_DATA_WEATHER,
};
use skyclock_time::{format_time_id, WorldInstant};

/// Entries in a complete snapshot (24 areas × 5 windows)
pub const FULL_SNAPSHOT_LEN: usize = 120;

/// One forecast for one area and one 8-world-hour window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForecastEntry {
    pub window_start_id: String,
    pub area_id: AreaId,
    pub condition_code: i32,
}

impl ForecastEntry {
    /// Build an entry for the window starting at `window_start`
    pub fn new(window_start: &WorldInstant, area_id: AreaId, condition_code: i32) -> Self {
        ForecastEntry {
            window_start_id: window_start.time_id(),
            area_id,
            condition_code,
        }
    }

    /// Decode an entry record
    pub fn from_record(record: &Record) -> SkyResult<Self> {
        let code: i32 = require_field(record, KEY_WEATHER_ID)?;
        let area: i32 = require_field(record, KEY_WEATHER_AREA)?;
        let year = record.require_int(PATH_DATA_WEATHER, KEY_WEATHER_YEAR)?;
        let month: u32 = require_field(record, KEY_WEATHER_MONTH)?;
        let day: u32 = require_field(record, KEY_WEATHER_DAY)?;
        let hour: u32 = require_field(record, KEY_WEATHER_HOUR)?;

        Ok(ForecastEntry {
            window_start_id: format_time_id(year, month, day, hour),
            area_id: AreaId::new(area),
            condition_code: code,
        })
    }

    /// Encode as an entry record carrying the window start's world fields
    pub fn to_record(window_start: &WorldInstant, area_id: AreaId, condition_code: i32) -> Record {
        let mut record = Record::new();
        record
            .put_int(KEY_WEATHER_ID, condition_code as i64)
            .put_int(KEY_WEATHER_AREA, area_id.get() as i64)
            .put_int(KEY_WEATHER_YEAR, window_start.year())
            .put_int(KEY_WEATHER_MONTH, window_start.month() as i64)
            .put_int(KEY_WEATHER_DAY, window_start.day() as i64)
            .put_int(KEY_WEATHER_HOUR, window_start.hour() as i64);
        record
    }
}

/// Integer field narrowed to `T`; out-of-range values are malformed
fn require_field<T: TryFrom<i64>>(record: &Record, key: &str) -> SkyResult<T> {
    let value = record.require_int(PATH_DATA_WEATHER, key)?;
    T::try_from(value).map_err(|_| SkyError::MalformedRecord {
        path: PATH_DATA_WEATHER.to_string(),
        key: key.to_string(),
    })
}

/// Entries decoded from a `/data/weather` record
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub entries: Vec<ForecastEntry>,
    /// Number of entry records carried, malformed ones included
    pub len: usize,
    /// `false` when the record had no entry list at all
    pub present: bool,
}

impl Snapshot {
    /// Decode the entry list. Malformed entries are skipped.
    pub fn decode(record: &Record) -> Self {
        let list = match record.get_list(KEY_WEATHER_LIST) {
            Some(list) => list,
            None => return Snapshot::default(),
        };

        let mut entries = Vec::with_capacity(list.len());
        for item in list {
            match ForecastEntry::from_record(item) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "skipping malformed forecast entry"),
            }
        }

        Snapshot {
            entries,
            len: list.len(),
            present: true,
        }
    }
}

/// Forecast entries of the selected area, keyed by window start id
#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: HashMap<String, ForecastEntry>,
    got_full_data: bool,
    confirmed_window_id: Option<String>,
}

impl ForecastCache {
    pub fn new() -> Self {
        ForecastCache::default()
    }

    /// Replace the cache contents with the entries for `selected`.
    /// An empty input leaves the cache untouched.
    pub fn rebuild(&mut self, entries: &[ForecastEntry], selected: AreaId) -> usize {
        if entries.is_empty() {
            return 0;
        }

        self.entries.clear();
        for entry in entries.iter().filter(|e| e.area_id == selected) {
            self.entries
                .insert(entry.window_start_id.clone(), entry.clone());
        }
        debug!(area = %selected, kept = self.entries.len(), total = entries.len(), "forecast cache rebuilt");
        self.entries.len()
    }

    /// Record the size of the last merged snapshot.
    /// A full snapshot confirms `now_window_id`; anything else is partial.
    pub fn record_snapshot(&mut self, len: usize, now_window_id: &str, expected: usize) {
        if len == expected {
            self.got_full_data = true;
            self.confirmed_window_id = Some(now_window_id.to_string());
            info!(len, window = now_window_id, "full forecast snapshot");
        } else {
            self.got_full_data = false;
            info!(len, expected, "partial forecast snapshot");
        }
    }

    pub fn lookup(&self, time_id: &str) -> Option<&ForecastEntry> {
        self.entries.get(time_id)
    }

    /// Whether the last snapshot was full and confirmed for `now_window_id`
    pub fn is_complete(&self, now_window_id: &str) -> bool {
        self.got_full_data && self.confirmed_window_id.as_deref() == Some(now_window_id)
    }

    pub fn got_full_data(&self) -> bool {
        self.got_full_data
    }

    pub fn confirmed_window_id(&self) -> Option<&str> {
        self.confirmed_window_id.as_deref()
    }

    /// Drop all entries and the completeness state
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.got_full_data = false;
        self.confirmed_window_id = None;
    }

    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
