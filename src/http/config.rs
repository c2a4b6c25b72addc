// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Engine configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::options::{TransferOptions, DEFAULT_OPTIONS};
use crate::error::{Error, Result};

/// Default bound on one multiplexer wait
pub const DEFAULT_WAIT_INTERVAL_MS: u64 = 1000;

const ENV_PREFIX: &str = "VOLLEY_";

/// HTTP engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Option overrides layered on top of [`DEFAULT_OPTIONS`]
    pub options: TransferOptions,
    /// Longest single wait for batch readiness
    pub wait_interval_ms: u64,
    /// Abort a batch that runs longer than this
    pub batch_deadline_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            options: TransferOptions::default(),
            wait_interval_ms: DEFAULT_WAIT_INTERVAL_MS,
            batch_deadline_ms: None,
        }
    }
}

impl EngineConfig {
    /// Create a new engine config
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("Invalid engine config: {}", e)))
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Build from `VOLLEY_*` environment variables.
    ///
    /// `VOLLEY_WAIT_INTERVAL_MS` and `VOLLEY_BATCH_DEADLINE_MS` configure the
    /// engine; any other `VOLLEY_<NAME>` is applied as transfer option
    /// `<name>` (see [`TransferOptions::set`]).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit variable list
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "WAIT_INTERVAL_MS" => config.wait_interval_ms = parse_ms(&key, &value)?,
                "BATCH_DEADLINE_MS" => config.batch_deadline_ms = Some(parse_ms(&key, &value)?),
                _ => {
                    config.options.set(&name.to_ascii_lowercase(), &value)?;
                }
            }
        }
        Ok(config)
    }

    /// Set option overrides
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the readiness wait bound
    pub fn wait_interval(mut self, interval: Duration) -> Self {
        self.wait_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the batch deadline
    pub fn batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    /// Engine defaults: the built-in defaults with this config's overrides
    pub fn transfer_defaults(&self) -> TransferOptions {
        DEFAULT_OPTIONS.merge(&self.options)
    }

    pub fn wait_interval_duration(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms.max(1))
    }

    pub fn batch_deadline_duration(&self) -> Option<Duration> {
        self.batch_deadline_ms.map(Duration::from_millis)
    }
}

fn parse_ms(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} must be a number of milliseconds", key)))
}
