//! Runtime configuration.
//!
//! [`SimulationConfig`] tunes the movement simulation; [`AppConfig`] is the
//! whole server configuration, read from `METRO_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::RouteCacheConfig;

/// Configuration errors, reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("tick interval minimum {min}s exceeds maximum {max}s")]
    TickRange { min: u64, max: u64 },
}

/// Parameters for the train movement simulation.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Shortest interval between two advances of one train (seconds).
    pub tick_min_secs: u64,

    /// Longest interval between two advances of one train (seconds).
    pub tick_max_secs: u64,

    /// Travel time jitter as a fraction of the scheduled time.
    /// `0.0` makes travel times deterministic.
    pub jitter_fraction: f64,

    /// Travel time used when the time matrix has no entry (seconds).
    pub fallback_travel_secs: u64,

    /// Upper bound on any single store call made while advancing (seconds).
    pub store_timeout_secs: u64,

    /// Smallest passenger change per stop.
    pub load_delta_min: i32,

    /// Largest passenger change per stop.
    pub load_delta_max: i32,
}

impl SimulationConfig {
    /// A configuration with no randomness in travel times or loads.
    pub fn deterministic() -> Self {
        Self {
            jitter_fraction: 0.0,
            load_delta_min: 0,
            load_delta_max: 0,
            ..Self::default()
        }
    }

    pub fn tick_min(&self) -> Duration {
        Duration::from_secs(self.tick_min_secs)
    }

    pub fn tick_max(&self) -> Duration {
        Duration::from_secs(self.tick_max_secs)
    }

    pub fn fallback_travel(&self) -> Duration {
        Duration::from_secs(self.fallback_travel_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_min_secs: 3,
            tick_max_secs: 8,
            jitter_fraction: 0.10,
            fallback_travel_secs: 180, // 3 minutes
            store_timeout_secs: 3,
            load_delta_min: -5,
            load_delta_max: 15,
        }
    }
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,

    /// JSON network file used to seed the store.
    pub data_path: PathBuf,

    /// SQLite database. When unset the in-memory store is used.
    pub db_path: Option<PathBuf>,

    /// UDP multicast target for train updates, if any.
    pub multicast: Option<SocketAddr>,

    pub simulation: SimulationConfig,

    pub route_cache: RouteCacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            data_path: PathBuf::from("data/network.json"),
            db_path: None,
            multicast: None,
            simulation: SimulationConfig::default(),
            route_cache: RouteCacheConfig::default(),
        }
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("METRO_BIND_ADDR") {
            config.bind_addr = parse("METRO_BIND_ADDR", v)?;
        }
        if let Some(v) = lookup("METRO_DATA") {
            config.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("METRO_DB").filter(|v| !v.is_empty()) {
            config.db_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("METRO_MULTICAST").filter(|v| !v.is_empty()) {
            config.multicast = Some(parse("METRO_MULTICAST", v)?);
        }

        let sim = &mut config.simulation;
        if let Some(v) = lookup("METRO_TICK_MIN_SECS") {
            sim.tick_min_secs = parse("METRO_TICK_MIN_SECS", v)?;
        }
        if let Some(v) = lookup("METRO_TICK_MAX_SECS") {
            sim.tick_max_secs = parse("METRO_TICK_MAX_SECS", v.clone())?;
            if sim.tick_max_secs == 0 {
                return Err(ConfigError::Invalid {
                    var: "METRO_TICK_MAX_SECS",
                    value: v,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if let Some(v) = lookup("METRO_JITTER") {
            let jitter: f64 = parse("METRO_JITTER", v.clone())?;
            if !(0.0..1.0).contains(&jitter) {
                return Err(ConfigError::Invalid {
                    var: "METRO_JITTER",
                    value: v,
                    reason: "must be in [0, 1)".to_string(),
                });
            }
            sim.jitter_fraction = jitter;
        }
        if let Some(v) = lookup("METRO_STORE_TIMEOUT_SECS") {
            sim.store_timeout_secs = parse("METRO_STORE_TIMEOUT_SECS", v)?;
        }

        if sim.tick_min_secs > sim.tick_max_secs {
            return Err(ConfigError::TickRange {
                min: sim.tick_min_secs,
                max: sim.tick_max_secs,
            });
        }

        Ok(config)
    }
}
