//! Configuration module for the Pulsetrail Tracker.
//!
//! A [`TrackerConfig`] is injected into each tracker instance. It can be
//! built in code from [`TrackerConfig::new`] or parsed from environment
//! variables with [`TrackerConfig::from_env`].
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PULSETRAIL_ENDPOINT` | Yes | - | Ingestion base URL (e.g., `https://app.example.com/api/events`) |
//! | `PULSETRAIL_SOURCE_ID` | No | hostname | Client identifier sent as `X-Source-Id` |
//! | `PULSETRAIL_ORIGIN` | No | - | Origin of the observed application, used to shorten link targets |
//! | `PULSETRAIL_INITIAL_PAGE` | No | empty | Page name before the first page view |
//! | `PULSETRAIL_TRACK_ALL_CLICKS` | No | true | Capture clicks on non-interactive elements |
//! | `PULSETRAIL_TRACK_RIGHT_CLICKS` | No | true | Capture right clicks |
//! | `PULSETRAIL_TRACK_DOUBLE_CLICKS` | No | true | Capture double clicks |
//! | `PULSETRAIL_TRACK_HOVER` | No | false | Capture debounced hovers (high volume) |
//! | `PULSETRAIL_TRACK_MOUSE_PATH` | No | false | Capture sampled pointer movement (very high volume) |
//! | `PULSETRAIL_BATCH_SIZE` | No | 10 | Queue length that triggers a flush |
//! | `PULSETRAIL_FLUSH_INTERVAL_MS` | No | 5000 | Periodic flush interval |
//! | `PULSETRAIL_IDLE_THRESHOLD_MS` | No | 300000 | Inactivity before the session goes idle |
//! | `PULSETRAIL_HOVER_DEBOUNCE_MS` | No | 1000 | Hover dwell before a hover is recorded |
//! | `PULSETRAIL_MOUSE_SAMPLE_MS` | No | 500 | Minimum gap between pointer movement samples |
//! | `PULSETRAIL_TEARDOWN_TIMEOUT_MS` | No | 2000 | Upper bound on the teardown dispatch |
//!
//! # Example
//!
//! ```no_run
//! use pulsetrail_tracker::config::TrackerConfig;
//!
//! let config = TrackerConfig::from_env().expect("Failed to load configuration");
//! println!("Endpoint: {}", config.endpoint);
//! ```

use std::env;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Default number of queued events that triggers a flush.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default periodic flush interval in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;

/// Default inactivity threshold in milliseconds (5 minutes).
pub const DEFAULT_IDLE_THRESHOLD_MS: u64 = 300_000;

/// Default hover dwell time in milliseconds.
pub const DEFAULT_HOVER_DEBOUNCE_MS: u64 = 1_000;

/// Default pointer movement sampling interval in milliseconds.
pub const DEFAULT_MOUSE_SAMPLE_MS: u64 = 500;

/// Default upper bound on the teardown dispatch in milliseconds.
pub const DEFAULT_TEARDOWN_TIMEOUT_MS: u64 = 2_000;

/// Default capacity of the signal channel between handle and event loop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable or field has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for one tracker instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Base URL of the ingestion service. Endpoint paths are appended to it.
    pub endpoint: String,

    /// Client identifier sent with every request.
    pub source_id: String,

    /// Origin of the observed application. Link destinations on this origin
    /// are described by path and query only.
    pub origin: Option<Url>,

    /// Page reported on errors until the first page view.
    pub initial_page: String,

    /// Capture every click, not only clicks on interactive elements.
    pub track_all_clicks: bool,

    /// Capture right clicks.
    pub track_right_clicks: bool,

    /// Capture double clicks.
    pub track_double_clicks: bool,

    /// Capture debounced hovers over important elements.
    pub track_hover: bool,

    /// Capture sampled pointer movement.
    pub track_mouse_path: bool,

    /// Queue length that triggers an immediate flush.
    pub batch_size: usize,

    /// Periodic flush interval.
    pub flush_interval: Duration,

    /// Inactivity before the session is considered idle.
    pub idle_threshold: Duration,

    /// How long a hover must dwell on one element before it is recorded.
    pub hover_debounce: Duration,

    /// Minimum gap between two pointer movement samples.
    pub mouse_path_sample_rate: Duration,

    /// Upper bound on the final flush and session-end dispatch at teardown.
    pub teardown_timeout: Duration,

    /// Capacity of the signal channel; signals beyond it are dropped.
    pub channel_capacity: usize,
}

impl TrackerConfig {
    /// Creates a configuration with default settings for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            source_id: get_hostname(),
            origin: None,
            initial_page: String::new(),
            track_all_clicks: true,
            track_right_clicks: true,
            track_double_clicks: true,
            track_hover: false,
            track_mouse_path: false,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            idle_threshold: Duration::from_millis(DEFAULT_IDLE_THRESHOLD_MS),
            hover_debounce: Duration::from_millis(DEFAULT_HOVER_DEBOUNCE_MS),
            mouse_path_sample_rate: Duration::from_millis(DEFAULT_MOUSE_SAMPLE_MS),
            teardown_timeout: Duration::from_millis(DEFAULT_TEARDOWN_TIMEOUT_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Creates a new `TrackerConfig` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `PULSETRAIL_ENDPOINT` is not set
    /// - a boolean, integer or URL variable cannot be parsed
    /// - a size or duration variable is zero
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pulsetrail_tracker::config::TrackerConfig;
    ///
    /// std::env::set_var("PULSETRAIL_ENDPOINT", "https://app.example.com/api/events");
    /// let config = TrackerConfig::from_env().unwrap();
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var("PULSETRAIL_ENDPOINT")
            .map_err(|_| ConfigError::MissingEnvVar("PULSETRAIL_ENDPOINT".to_string()))?;

        let mut config = Self::new(endpoint);

        if let Ok(source_id) = env::var("PULSETRAIL_SOURCE_ID") {
            config.source_id = source_id;
        }

        if let Ok(origin) = env::var("PULSETRAIL_ORIGIN") {
            let url = Url::parse(&origin).map_err(|e| ConfigError::InvalidValue {
                key: "PULSETRAIL_ORIGIN".to_string(),
                message: format!("expected absolute URL, got '{origin}': {e}"),
            })?;
            config.origin = Some(url);
        }

        if let Ok(page) = env::var("PULSETRAIL_INITIAL_PAGE") {
            config.initial_page = page;
        }

        config.track_all_clicks = env_bool("PULSETRAIL_TRACK_ALL_CLICKS", config.track_all_clicks)?;
        config.track_right_clicks =
            env_bool("PULSETRAIL_TRACK_RIGHT_CLICKS", config.track_right_clicks)?;
        config.track_double_clicks =
            env_bool("PULSETRAIL_TRACK_DOUBLE_CLICKS", config.track_double_clicks)?;
        config.track_hover = env_bool("PULSETRAIL_TRACK_HOVER", config.track_hover)?;
        config.track_mouse_path = env_bool("PULSETRAIL_TRACK_MOUSE_PATH", config.track_mouse_path)?;

        config.batch_size =
            env_positive("PULSETRAIL_BATCH_SIZE", DEFAULT_BATCH_SIZE as u64)? as usize;
        config.flush_interval =
            env_millis("PULSETRAIL_FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS)?;
        config.idle_threshold =
            env_millis("PULSETRAIL_IDLE_THRESHOLD_MS", DEFAULT_IDLE_THRESHOLD_MS)?;
        config.hover_debounce =
            env_millis("PULSETRAIL_HOVER_DEBOUNCE_MS", DEFAULT_HOVER_DEBOUNCE_MS)?;
        config.mouse_path_sample_rate =
            env_millis("PULSETRAIL_MOUSE_SAMPLE_MS", DEFAULT_MOUSE_SAMPLE_MS)?;
        config.teardown_timeout =
            env_millis("PULSETRAIL_TEARDOWN_TIMEOUT_MS", DEFAULT_TEARDOWN_TIMEOUT_MS)?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that sizes and durations are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.endpoint).is_err() {
            return Err(invalid(
                "endpoint",
                format!("expected absolute URL, got '{}'", self.endpoint),
            ));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "batch size must be greater than 0"));
        }
        if self.channel_capacity == 0 {
            return Err(invalid("channel_capacity", "channel capacity must be greater than 0"));
        }
        for (key, value) in [
            ("flush_interval", self.flush_interval),
            ("idle_threshold", self.idle_threshold),
            ("hover_debounce", self.hover_debounce),
            ("mouse_path_sample_rate", self.mouse_path_sample_rate),
            ("teardown_timeout", self.teardown_timeout),
        ] {
            if value.is_zero() {
                return Err(invalid(key, "duration must be greater than 0"));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Parses a boolean variable, accepting `true/false`, `1/0`, `yes/no`, `on/off`.
fn env_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, format!("expected boolean, got '{val}'"))),
        },
        Err(_) => Ok(default),
    }
}

/// Parses a strictly positive integer variable.
fn env_positive(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(val) => {
            let parsed = val
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(key, format!("expected positive integer, got '{val}'")))?;
            if parsed == 0 {
                return Err(invalid(key, "value must be greater than 0"));
            }
            Ok(parsed)
        }
        Err(_) => Ok(default),
    }
}

fn env_millis(key: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    env_positive(key, default_ms).map(Duration::from_millis)
}

/// Gets the system hostname, falling back to "unknown" if it cannot be determined.
fn get_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to run tests with isolated environment variables.
    /// Clears all PULSETRAIL_* vars before the test and restores them after.
    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved_vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with("PULSETRAIL_"))
            .collect();

        for (key, _) in &saved_vars {
            env::remove_var(key);
        }

        let result = f();

        for (key, _) in env::vars().filter(|(k, _)| k.starts_with("PULSETRAIL_")) {
            env::remove_var(key);
        }
        for (key, value) in saved_vars {
            env::set_var(key, value);
        }

        result
    }

    #[test]
    fn new_uses_documented_defaults() {
        let config = TrackerConfig::new("https://app.example.com/api/events");

        assert!(config.track_all_clicks);
        assert!(config.track_right_clicks);
        assert!(config.track_double_clicks);
        assert!(!config.track_hover);
        assert!(!config.track_mouse_path);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.flush_interval, Duration::from_millis(5_000));
        assert_eq!(config.idle_threshold, Duration::from_millis(300_000));
        assert_eq!(config.hover_debounce, Duration::from_millis(1_000));
        assert_eq!(config.mouse_path_sample_rate, Duration::from_millis(500));
        assert!(!config.source_id.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = TrackerConfig::new("https://app.example.com/api/events");
        config.batch_size = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "batch_size"));
    }

    #[test]
    fn validate_rejects_zero_duration() {
        let mut config = TrackerConfig::new("https://app.example.com/api/events");
        config.idle_threshold = Duration::ZERO;

        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "idle_threshold")
        );
    }

    #[test]
    fn validate_rejects_relative_endpoint() {
        let config = TrackerConfig::new("/api/events");

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "endpoint"));
    }

    #[test]
    #[serial]
    fn test_missing_endpoint() {
        with_clean_env(|| {
            let err = TrackerConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref s) if s == "PULSETRAIL_ENDPOINT"));
        });
    }

    #[test]
    #[serial]
    fn test_minimal_config() {
        with_clean_env(|| {
            env::set_var("PULSETRAIL_ENDPOINT", "https://test.example.com/api/events");

            let config = TrackerConfig::from_env().expect("should parse minimal config");

            assert_eq!(config.endpoint, "https://test.example.com/api/events");
            assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
            assert!(config.origin.is_none());
            assert!(!config.source_id.is_empty());
        });
    }

    #[test]
    #[serial]
    fn test_full_config() {
        with_clean_env(|| {
            env::set_var("PULSETRAIL_ENDPOINT", "https://test.example.com/api/events");
            env::set_var("PULSETRAIL_SOURCE_ID", "kiosk-7");
            env::set_var("PULSETRAIL_ORIGIN", "https://test.example.com");
            env::set_var("PULSETRAIL_INITIAL_PAGE", "dashboard");
            env::set_var("PULSETRAIL_TRACK_ALL_CLICKS", "false");
            env::set_var("PULSETRAIL_TRACK_HOVER", "yes");
            env::set_var("PULSETRAIL_TRACK_MOUSE_PATH", "1");
            env::set_var("PULSETRAIL_BATCH_SIZE", "25");
            env::set_var("PULSETRAIL_FLUSH_INTERVAL_MS", "2500");
            env::set_var("PULSETRAIL_IDLE_THRESHOLD_MS", "60000");
            env::set_var("PULSETRAIL_HOVER_DEBOUNCE_MS", "750");
            env::set_var("PULSETRAIL_MOUSE_SAMPLE_MS", "250");
            env::set_var("PULSETRAIL_TEARDOWN_TIMEOUT_MS", "500");

            let config = TrackerConfig::from_env().expect("should parse full config");

            assert_eq!(config.source_id, "kiosk-7");
            assert_eq!(
                config.origin.as_ref().map(Url::as_str),
                Some("https://test.example.com/")
            );
            assert_eq!(config.initial_page, "dashboard");
            assert!(!config.track_all_clicks);
            assert!(config.track_hover);
            assert!(config.track_mouse_path);
            assert_eq!(config.batch_size, 25);
            assert_eq!(config.flush_interval, Duration::from_millis(2500));
            assert_eq!(config.idle_threshold, Duration::from_millis(60_000));
            assert_eq!(config.hover_debounce, Duration::from_millis(750));
            assert_eq!(config.mouse_path_sample_rate, Duration::from_millis(250));
            assert_eq!(config.teardown_timeout, Duration::from_millis(500));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_batch_size() {
        with_clean_env(|| {
            env::set_var("PULSETRAIL_ENDPOINT", "https://test.example.com/api/events");
            env::set_var("PULSETRAIL_BATCH_SIZE", "many");

            let err = TrackerConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "PULSETRAIL_BATCH_SIZE"
            ));
        });
    }

    #[test]
    #[serial]
    fn test_zero_flush_interval_rejected() {
        with_clean_env(|| {
            env::set_var("PULSETRAIL_ENDPOINT", "https://test.example.com/api/events");
            env::set_var("PULSETRAIL_FLUSH_INTERVAL_MS", "0");

            let err = TrackerConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, ref message }
                    if key == "PULSETRAIL_FLUSH_INTERVAL_MS" && message.contains("greater than 0")
            ));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_boolean() {
        with_clean_env(|| {
            env::set_var("PULSETRAIL_ENDPOINT", "https://test.example.com/api/events");
            env::set_var("PULSETRAIL_TRACK_HOVER", "sometimes");

            let err = TrackerConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "PULSETRAIL_TRACK_HOVER"
            ));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_origin() {
        with_clean_env(|| {
            env::set_var("PULSETRAIL_ENDPOINT", "https://test.example.com/api/events");
            env::set_var("PULSETRAIL_ORIGIN", "not a url");

            let err = TrackerConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "PULSETRAIL_ORIGIN"
            ));
        });
    }
}
