//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local runs.

use crate::location::replay::MIN_REPLAY_SPEEDUP;
use crate::location::WatchOptions;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Identity ---
    /// Local user id (document id of this rider's group location)
    pub user_id: String,
    /// Name shown to other group members
    pub display_name: String,

    // --- Backend ---
    /// GCP project ID
    pub gcp_project_id: String,
    /// How often Firestore subscriptions re-query
    pub subscription_poll_interval: Duration,

    // --- Ride recording ---
    /// Minimum time between location fixes
    pub ride_min_interval: Duration,
    /// Minimum displacement between location fixes (meters)
    pub ride_min_distance_m: f64,

    // --- Group tracking ---
    /// Period of the group location broadcast
    pub group_broadcast_interval: Duration,

    // --- Crash detection ---
    pub crash_threshold_g: f64,
    pub sos_countdown: Duration,

    // --- Replay driver ---
    /// JSON-lines fix log replayed by the binary
    pub replay_file: Option<PathBuf>,
    /// Replay time compression (2.0 replays twice as fast)
    pub replay_speedup: f64,
    /// Group to broadcast to while replaying
    pub group_id: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            user_id: "test_user".to_string(),
            display_name: "Rider".to_string(),
            gcp_project_id: "test-project".to_string(),
            subscription_poll_interval: Duration::from_millis(2000),
            ride_min_interval: Duration::from_millis(1000),
            ride_min_distance_m: 5.0,
            group_broadcast_interval: Duration::from_secs(5),
            crash_threshold_g: 3.5,
            sos_countdown: Duration::from_secs(10),
            replay_file: None,
            replay_speedup: 1.0,
            group_id: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let replay_speedup = validate_replay_speedup(parse_or("REPLAY_SPEEDUP", 1.0)?)?;

        Ok(Self {
            user_id: env::var("USER_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("USER_ID"))?,
            display_name: env::var("DISPLAY_NAME").unwrap_or_else(|_| "Rider".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            subscription_poll_interval: Duration::from_millis(parse_or(
                "SUBSCRIPTION_POLL_INTERVAL_MS",
                2000,
            )?),
            ride_min_interval: Duration::from_millis(parse_or("RIDE_MIN_INTERVAL_MS", 1000)?),
            ride_min_distance_m: parse_or("RIDE_MIN_DISTANCE_M", 5.0)?,
            group_broadcast_interval: Duration::from_secs(parse_or(
                "GROUP_BROADCAST_INTERVAL_SECS",
                5,
            )?),
            crash_threshold_g: parse_or("CRASH_THRESHOLD_G", 3.5)?,
            sos_countdown: Duration::from_secs(parse_or("SOS_COUNTDOWN_SECS", 10)?),
            replay_file: env::var("REPLAY_FILE").ok().map(PathBuf::from),
            replay_speedup,
            group_id: env::var("GROUP_ID").ok().filter(|v| !v.trim().is_empty()),
        })
    }

    /// Watch options for ride recording.
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            min_interval: self.ride_min_interval,
            min_distance_m: self.ride_min_distance_m,
            ..WatchOptions::default()
        }
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Replay rate must be finite and at least [`MIN_REPLAY_SPEEDUP`].
fn validate_replay_speedup(speedup: f64) -> Result<f64, ConfigError> {
    if speedup.is_finite() && speedup >= MIN_REPLAY_SPEEDUP {
        Ok(speedup)
    } else {
        Err(ConfigError::Invalid("REPLAY_SPEEDUP"))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
