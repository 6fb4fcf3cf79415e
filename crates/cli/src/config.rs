use std::path::PathBuf;
use std::time::Duration;

use cliptrim_client::monitor::{MonitorOptions, Transport, DEFAULT_POLL_INTERVAL};

/// Default backend address (the development server).
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
/// Default timeout for non-streaming requests.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Front-end configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Backend base URL (default: `http://127.0.0.1:5000`).
    pub backend_url: String,
    /// How job progress is followed (default: `poll`).
    pub transport: Transport,
    /// Delay between progress polls (default: 1000 ms).
    pub poll_interval: Duration,
    /// Timeout for every request except the progress stream (default: `30` s).
    pub request_timeout: Duration,
    /// Image used as the live video frame for crop editing.
    pub frame_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            transport: Transport::Poll,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            frame_path: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                  |
    /// |---------------------------------|--------------------------|
    /// | `CLIPTRIM_BACKEND_URL`          | `http://127.0.0.1:5000`  |
    /// | `CLIPTRIM_TRANSPORT`            | `poll` (or `stream`)     |
    /// | `CLIPTRIM_POLL_INTERVAL_MS`     | `1000`                   |
    /// | `CLIPTRIM_REQUEST_TIMEOUT_SECS` | `30`                     |
    /// | `CLIPTRIM_FRAME_PATH`           | unset                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`CliConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let backend_url = get("CLIPTRIM_BACKEND_URL").unwrap_or(defaults.backend_url);

        let transport = match get("CLIPTRIM_TRANSPORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "CLIPTRIM_TRANSPORT",
                expected: "'poll' or 'stream'",
                value,
            })?,
            None => defaults.transport,
        };

        let poll_interval = match get("CLIPTRIM_POLL_INTERVAL_MS") {
            Some(value) => match value.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CLIPTRIM_POLL_INTERVAL_MS",
                        expected: "a positive number of milliseconds",
                        value,
                    })
                }
            },
            None => defaults.poll_interval,
        };

        let request_timeout = match get("CLIPTRIM_REQUEST_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CLIPTRIM_REQUEST_TIMEOUT_SECS",
                        expected: "a positive number of seconds",
                        value,
                    })
                }
            },
            None => defaults.request_timeout,
        };

        let frame_path = get("CLIPTRIM_FRAME_PATH").map(PathBuf::from);

        Ok(Self {
            backend_url,
            transport,
            poll_interval,
            request_timeout,
            frame_path,
        })
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            interval: self.poll_interval,
            transport: self.transport,
        }
    }
}
