//! Tracing subscriber setup for binaries

use tracing_subscriber::EnvFilter;

use skyclock_core::{SkyError, SkyResult};

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// filter. Fails when a global subscriber is already installed.
pub fn init_tracing(json: bool) -> SkyResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| SkyError::Config(format!("tracing init failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        let _ = init_tracing(false);
        assert!(matches!(init_tracing(true), Err(SkyError::Config(_))));
    }
}
