//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::watcher::DEFAULT_FILE_PREFIX;

/// Environment variable holding the controller base URL.
pub const ENV_CONTROLLER_URL: &str = "CONTROLLER_API_URL";
/// Environment variable holding the controller API token.
pub const ENV_CONTROLLER_TOKEN: &str = "CONTROLLER_API_TOKEN";
/// Environment variable overriding the monitor interval in seconds.
pub const ENV_INTERVAL_SECS: &str = "RUNNER_AGENT_INTERVAL_SECS";
/// Environment variable overriding the directory to scan.
pub const ENV_ROOT: &str = "RUNNER_AGENT_ROOT";
/// Environment variable overriding the worker log prefix.
pub const ENV_FILE_PREFIX: &str = "RUNNER_AGENT_FILE_PREFIX";

/// Upper bound IMDS accepts for a session token TTL.
pub const MAX_TOKEN_TTL_SECS: u32 = 21600;

/// What to do when instance metadata cannot be collected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataPolicy {
    /// Log the failure and keep monitoring without an identity.
    #[default]
    Tolerant,
    /// Abort startup.
    Strict,
}

/// Monitor loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between ticks.
    pub interval_secs: u64,
    /// Directory tree to scan for worker logs.
    pub root: PathBuf,
    /// File name prefix of worker logs.
    pub file_prefix: String,
    /// Re-report the instance with a fresh timestamp on every tick.
    pub instance_heartbeat: bool,
    /// Post a memory sample on every tick.
    pub report_memory: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            root: PathBuf::from("."),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            instance_heartbeat: false,
            report_memory: false,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Controller API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Base URL, e.g. `https://controller.example.com/api`.
    pub url: Option<String>,
    /// API token sent with every request.
    pub token: Option<String>,
    /// Overall request timeout in seconds.
    pub timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Instance metadata service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Metadata service base URL.
    pub endpoint: String,
    /// Lifetime requested for the session token.
    pub token_ttl_secs: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Startup failure policy.
    pub policy: MetadataPolicy,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://169.254.169.254".to_string(),
            token_ttl_secs: MAX_TOKEN_TTL_SECS,
            timeout_secs: 5,
            policy: MetadataPolicy::Tolerant,
        }
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub monitor: MonitorConfig,
    pub controller: ControllerConfig,
    pub metadata: MetadataConfig,
}

impl AgentConfig {
    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override has an invalid value.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the interval override is not a
    /// whole number of seconds.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_CONTROLLER_URL) {
            self.controller.url = Some(url);
        }
        if let Some(token) = get(ENV_CONTROLLER_TOKEN) {
            self.controller.token = Some(token);
        }
        if let Some(interval) = get(ENV_INTERVAL_SECS) {
            self.monitor.interval_secs =
                interval.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: "monitor.interval_secs",
                    reason: format!("{ENV_INTERVAL_SECS}={interval} is not a whole number"),
                })?;
        }
        if let Some(root) = get(ENV_ROOT) {
            self.monitor.root = PathBuf::from(root);
        }
        if let Some(prefix) = get(ENV_FILE_PREFIX) {
            self.monitor.file_prefix = prefix;
        }
        Ok(())
    }

    /// Validate the settings the monitor loop depends on.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero interval or an empty root or prefix.
    pub fn validate_monitor(&self) -> Result<(), ConfigError> {
        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "monitor.interval_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.monitor.root.as_os_str().is_empty() {
            return Err(ConfigError::Missing("monitor.root"));
        }
        if self.monitor.file_prefix.is_empty() {
            return Err(ConfigError::Missing("monitor.file_prefix"));
        }
        Ok(())
    }

    /// Validate everything needed to run the full agent.
    ///
    /// # Errors
    ///
    /// Returns an error if monitor settings are invalid, the token TTL is
    /// out of range, or the controller URL or token is missing or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_monitor()?;

        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.metadata.token_ttl_secs) {
            return Err(ConfigError::Invalid {
                field: "metadata.token_ttl_secs",
                reason: format!("must be between 1 and {MAX_TOKEN_TTL_SECS}"),
            });
        }

        let url = self
            .controller
            .url
            .as_deref()
            .ok_or(ConfigError::Missing("controller.url"))?;
        url::Url::parse(url).map_err(|e| ConfigError::Invalid {
            field: "controller.url",
            reason: e.to_string(),
        })?;

        if self.controller.token.as_deref().unwrap_or_default().is_empty() {
            return Err(ConfigError::Missing("controller.token"));
        }
        Ok(())
    }
}
