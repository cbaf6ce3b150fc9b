// SPDX-License-Identifier: MIT

//! Runtime configuration
//!
//! Values come from the environment (a `.env` file is loaded first by the
//! binary) and can be overridden by command-line flags.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::FlowError;

pub const ENV_STEP_DELAY_MS: &str = "FLOWRUN_STEP_DELAY_MS";
pub const ENV_FAILURE_RATE: &str = "FLOWRUN_FAILURE_RATE";
pub const ENV_MIN_LATENCY_MS: &str = "FLOWRUN_MIN_LATENCY_MS";
pub const ENV_MAX_LATENCY_MS: &str = "FLOWRUN_MAX_LATENCY_MS";
pub const ENV_SEED: &str = "FLOWRUN_SEED";
pub const ENV_FLOWS_DIR: &str = "FLOWRUN_FLOWS_DIR";

/// How the simulated node operations behave
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Probability in `[0, 1]` that an operation fails
    pub failure_rate: f64,
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.1,
            min_latency: Duration::from_millis(500),
            max_latency: Duration::from_millis(2500),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Never fails, never waits
    pub fn instant() -> Self {
        Self {
            failure_rate: 0.0,
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(FlowError::config(format!(
                "failure rate must be between 0 and 1, got {}",
                self.failure_rate
            )));
        }
        if self.min_latency > self.max_latency {
            return Err(FlowError::config(format!(
                "min latency {:?} exceeds max latency {:?}",
                self.min_latency, self.max_latency
            )));
        }
        Ok(())
    }
}

/// Everything the binary needs to run flows
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub step_delay: Duration,
    pub simulation: SimulationConfig,
    pub flows_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(300),
            simulation: SimulationConfig::default(),
            flows_dir: PathBuf::from("flows"),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any `FLOWRUN_*` variables that are set
    pub fn from_env() -> Result<Self, FlowError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_STEP_DELAY_MS)? {
            config.step_delay = Duration::from_millis(ms);
        }
        if let Some(rate) = parse_var::<f64, _>(&lookup, ENV_FAILURE_RATE)? {
            config.simulation.failure_rate = rate;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_MIN_LATENCY_MS)? {
            config.simulation.min_latency = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_MAX_LATENCY_MS)? {
            config.simulation.max_latency = Duration::from_millis(ms);
        }
        config.simulation.seed = parse_var::<u64, _>(&lookup, ENV_SEED)?;
        if let Some(dir) = lookup(ENV_FLOWS_DIR).filter(|d| !d.is_empty()) {
            config.flows_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        self.simulation.validate()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, FlowError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| FlowError::config(format!("{}={:?}: {}", key, raw, e))),
    }
}
