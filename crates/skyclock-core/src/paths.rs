//! Wire paths and record keys
//!
//! These strings must match exactly between the primary and companion roles.

/// Companion → primary, empty payload
pub const PATH_REQUEST_FETCH: &str = "/request/fetch";

/// Primary → companion, full forecast snapshot
pub const PATH_DATA_WEATHER: &str = "/data/weather";

/// Bidirectional area selection
pub const PATH_DATA_AREA: &str = "/data/area";

/// List of forecast entry records on `/data/weather`
pub const KEY_WEATHER_LIST: &str = "KEY_WEATHER_LIST";

/// Condition code of a forecast entry
pub const KEY_WEATHER_ID: &str = "KEY_WEATHER_ID";

/// Area id of a forecast entry, and the area key on `/data/area`
pub const KEY_WEATHER_AREA: &str = "KEY_WEATHER_AREA";

/// World-clock fields of a forecast entry's window start
pub const KEY_WEATHER_YEAR: &str = "KEY_WEATHER_YEAR";
pub const KEY_WEATHER_MONTH: &str = "KEY_WEATHER_MONTH";
pub const KEY_WEATHER_DAY: &str = "KEY_WEATHER_DAY";
pub const KEY_WEATHER_HOUR: &str = "KEY_WEATHER_HOUR";

/// Paths that carry a replicated store record
pub const STORE_PATHS: [&str; 2] = [PATH_DATA_WEATHER, PATH_DATA_AREA];
