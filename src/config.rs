//! Runtime settings loaded from environment variables.
//!
//! Every variable is optional; unparsable values fall back to the default.

use std::env;
use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default simulator cadence in seconds.
pub const DEFAULT_TICK_SECS: u64 = 3;

/// Default notification retention in hours.
pub const DEFAULT_NOTIFICATION_TTL_HOURS: i64 = 24;

/// Locations simulated when none are configured.
pub const DEFAULT_LOCATIONS: [&str; 3] = ["Downtown", "Residential Area", "Industrial Zone"];

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub tick_interval: Duration,
    /// `None` seeds the simulator from OS entropy.
    pub seed: Option<u64>,
    pub locations: Vec<String>,
    pub notification_ttl: chrono::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            seed: None,
            locations: DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect(),
            notification_ttl: chrono::Duration::hours(DEFAULT_NOTIFICATION_TTL_HOURS),
        }
    }
}

impl Settings {
    /// Read `AIRWATCH_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = lookup("AIRWATCH_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let tick_interval = lookup("AIRWATCH_TICK_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.tick_interval);

        let seed = lookup("AIRWATCH_SEED").and_then(|s| s.parse().ok());

        let locations = lookup("AIRWATCH_LOCATIONS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|locations| !locations.is_empty())
            .unwrap_or(defaults.locations);

        let notification_ttl = lookup("AIRWATCH_NOTIFICATION_TTL_HOURS")
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|hours| *hours > 0)
            .map(chrono::Duration::hours)
            .unwrap_or(defaults.notification_ttl);

        Self {
            port,
            tick_interval,
            seed,
            locations,
            notification_ttl,
        }
    }
}
