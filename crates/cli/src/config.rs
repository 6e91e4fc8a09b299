//! Configuration management for the CLI
//!
//! Settings are layered, later sources winning:
//! built-in defaults, an optional config file, `ALLOCATABLE_*` environment
//! variables, then command-line flags.

use allocatable_lib::{AnalysisConfig, PolicyKind};
use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable prefix (`ALLOCATABLE_CPU_THRESHOLD`, ...)
const ENV_PREFIX: &str = "ALLOCATABLE";

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub memory_threshold: Option<u64>,
    pub cpu_threshold: Option<u64>,
    pub policy: Option<PolicyKind>,
}

/// Load the analysis configuration
pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<AnalysisConfig> {
    let defaults = AnalysisConfig::default();

    let mut builder = config::Config::builder()
        .set_default("memory_threshold", defaults.memory_threshold)?
        .set_default("cpu_threshold", defaults.cpu_threshold)?
        .set_default("reservation_policy", defaults.reservation_policy.to_string())?
        .set_default("max_line_bytes", defaults.max_line_bytes as u64)?;

    if let Some(path) = file {
        if !path.exists() {
            anyhow::bail!("Config file {} does not exist", path.display());
        }
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

    if let Some(value) = overrides.memory_threshold {
        builder = builder.set_override("memory_threshold", value)?;
    }
    if let Some(value) = overrides.cpu_threshold {
        builder = builder.set_override("cpu_threshold", value)?;
    }
    if let Some(policy) = overrides.policy {
        builder = builder.set_override("reservation_policy", policy.to_string())?;
    }

    let config: AnalysisConfig = builder
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    config.thresholds().context("Invalid thresholds in configuration")?;
    tracing::debug!(
        memory_threshold = config.memory_threshold,
        cpu_threshold = config.cpu_threshold,
        policy = %config.reservation_policy,
        max_line_bytes = config.max_line_bytes,
        "Loaded analysis configuration"
    );
    Ok(config)
}
