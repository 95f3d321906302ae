//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Each
//! section maps onto one component's own config type so the binary wires
//! components without translation layers.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::campaign::CampaignConfig;
use crate::gate::GateConfig;
use crate::strategy::groups::GroupConfig;
use crate::strategy::payout::PayoutConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub run: RunConfig,
    pub events: EventsConfig,
    pub gate: GateConfig,
    pub campaign: CampaignConfig,
    pub strategy: GroupConfig,
    pub payout: PayoutConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    pub name: String,
    /// Campaign store location.
    pub state_path: PathBuf,
    /// Root of the dated snapshot tree.
    pub snapshot_dir: PathBuf,
    /// Digest body output, picked up by the delivery hook.
    pub digest_path: PathBuf,
    /// Machine-readable per-run report.
    pub run_report_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    /// Local results file (also the cache target when `url` is set).
    pub path: PathBuf,
    /// Optional download location checked before reading `path`.
    #[serde(default)]
    pub url: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;

        if config.gate.percentile_low > config.gate.percentile_high {
            anyhow::bail!(
                "gate.percentile_low ({}) must not exceed gate.percentile_high ({})",
                config.gate.percentile_low,
                config.gate.percentile_high,
            );
        }
        if config.gate.window == 0 || config.campaign.window == 0 {
            anyhow::bail!("window lengths must be at least 1");
        }

        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
