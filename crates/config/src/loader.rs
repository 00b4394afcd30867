//! Configuration loader for relaykit
//!
//! Loading happens once at startup in three layers: built-in defaults, an
//! optional JSON file, then environment overrides (`RELAYKIT_*` by default).
//! The merged result is validated before it is handed out.

use crate::config::RelayConfig;
use relaykit_core::{Error, Result, ENV_PREFIX};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Builder that assembles a [`RelayConfig`] from file and environment
pub struct ConfigLoader {
    /// Optional JSON file layered over the defaults
    file: Option<PathBuf>,
    /// Prefix for environment overrides
    env_prefix: String,
    /// Explicit variables; the process environment is read when absent
    env_vars: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: ENV_PREFIX.to_string(),
            env_vars: None,
        }
    }

    /// Layer a JSON file over the defaults
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Change the environment variable prefix
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read overrides from the given variables instead of the process environment
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Load, merge and validate the configuration
    pub fn load(self) -> Result<RelayConfig> {
        let mut config = match &self.file {
            Some(path) => read_file(path)?,
            None => RelayConfig::default(),
        };

        let vars = match self.env_vars {
            Some(vars) => vars,
            None => std::env::vars().collect(),
        };
        apply_env_overrides(&mut config, &self.env_prefix, &vars)?;

        config.validate()?;
        debug!(
            service = %config.service_name,
            dependencies = config.dependencies.len(),
            "configuration loaded"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(path: &Path) -> Result<RelayConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::configuration(format!(
            "failed to read configuration file '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        Error::configuration(format!(
            "invalid configuration file '{}': {e}",
            path.display()
        ))
    })
}

fn apply_env_overrides(
    config: &mut RelayConfig,
    prefix: &str,
    vars: &HashMap<String, String>,
) -> Result<()> {
    let lookup = |suffix: &str| {
        let key = format!("{prefix}_{suffix}");
        vars.get(&key).map(|value| (key, value.trim()))
    };

    if let Some((_, value)) = lookup("SERVICE_NAME") {
        config.service_name = value.to_string();
    }
    if let Some((key, value)) = lookup("BREAKER_MAX_FAILURES") {
        config.breaker.max_failures = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("BREAKER_OPEN_TIMEOUT_MS") {
        config.breaker.open_timeout_ms = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("RETRY_MAX_RETRIES") {
        config.retry.max_retries = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("RETRY_BASE_DELAY_MS") {
        config.retry.base_delay_ms = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("RETRY_MAX_DELAY_MS") {
        config.retry.max_delay_ms = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("RETRY_JITTER_FACTOR") {
        config.retry.jitter_factor = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("CLIENT_CALL_TIMEOUT_MS") {
        config.client.call_timeout_ms = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("BUS_QUEUE_CAPACITY") {
        config.bus.queue_capacity = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("BUS_SHUTDOWN_GRACE_MS") {
        config.bus.shutdown_grace_ms = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("BUS_FAILURE_HISTORY") {
        config.bus.failure_history = parse_var(&key, value)?;
    }
    if let Some((key, value)) = lookup("SAGA_COMPENSATION_TIMEOUT_MS") {
        config.saga.compensation_timeout_ms = if value.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(parse_var(&key, value)?)
        };
    }

    Ok(())
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| Error::configuration(format!("invalid value '{value}' for {key}: {e}")))
}
