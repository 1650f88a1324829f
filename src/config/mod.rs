//! Service Configuration
//!
//! Configuration for the poll service: HTTP bind address, route prefix,
//! code/poll limits, and expiry timing. Loaded once at startup from a JSON
//! or JSON5 file; never reloaded.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Poll service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollServiceConfig {
    /// Host the code-issuance endpoint binds to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Port the code-issuance endpoint binds to
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    /// Path prefix for the code-issuance routes
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    /// Length of issued vote codes, in hex characters
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// Seconds a poll stays alive before the sweep evicts it
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Seconds between expiry sweep ticks
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Maximum number of concurrently active polls
    #[serde(default = "default_max_polls")]
    pub max_polls: usize,
    /// Maximum outstanding (unconsumed) codes per poll
    #[serde(default = "default_max_codes")]
    pub max_codes_per_poll: usize,
    /// Default log filter (overridable from the CLI)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PollServiceConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            bind_port: default_bind_port(),
            route_prefix: default_route_prefix(),
            code_length: default_code_length(),
            poll_timeout_secs: default_poll_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            max_polls: default_max_polls(),
            max_codes_per_poll: default_max_codes(),
            log_level: default_log_level(),
        }
    }
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    1334
}

fn default_route_prefix() -> String {
    "/delator/poll".to_string()
}

fn default_code_length() -> usize {
    4
}

fn default_poll_timeout() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    5
}

fn default_max_polls() -> usize {
    1024
}

fn default_max_codes() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl PollServiceConfig {
    /// Load configuration from a file, or defaults when no path is given.
    ///
    /// `.json5` files are parsed as JSON5, everything else as strict JSON.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let is_json5 = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json5"))
                    .unwrap_or(false);
                if is_json5 {
                    json5::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?
                } else {
                    serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code_length == 0 {
            return Err(ConfigError::Invalid("code_length must be at least 1".into()));
        }
        if self.max_polls == 0 {
            return Err(ConfigError::Invalid("max_polls must be at least 1".into()));
        }
        if self.max_codes_per_poll == 0 {
            return Err(ConfigError::Invalid(
                "max_codes_per_poll must be at least 1".into(),
            ));
        }
        if !self.route_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(
                "route_prefix must start with '/'".into(),
            ));
        }
        Ok(())
    }

    /// Route prefix without a trailing slash
    pub fn normalized_prefix(&self) -> &str {
        self.route_prefix.trim_end_matches('/')
    }

    /// Public base URL of the code-issuance endpoint, for chat replies
    pub fn code_endpoint(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.bind_host,
            self.bind_port,
            self.normalized_prefix()
        )
    }

    /// Poll expiry timeout as a `Duration`
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Sweep tick interval as a `Duration`
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
