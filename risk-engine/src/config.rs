//! Configuration for the risk engine

use crate::channel::ChannelConfig;
use crate::estimator::{HeuristicConfig, RemoteConfig, RequestMethod};
use crate::signals::SignalConfig;
use crate::{Error, Result};
use payguard_core::GateThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Risk engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decision gate thresholds
    pub gate: GateThresholds,

    /// Remote scoring service
    pub remote: RemoteConfig,

    /// Local heuristic estimator
    pub heuristic: HeuristicConfig,

    /// Signal book
    pub signals: SignalConfig,

    /// Video analysis channel
    pub channel: ChannelConfig,

    /// Directory for the file-backed session store
    pub session_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gate: GateThresholds::default(),
            remote: RemoteConfig::default(),
            heuristic: HeuristicConfig::default(),
            signals: SignalConfig::default(),
            channel: ChannelConfig::default(),
            session_dir: PathBuf::from("./data/session"),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Optional file, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PAYGUARD_*` environment variables
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("PAYGUARD_SCORING_URL") {
            self.remote.endpoint = Some(url).filter(|u| !u.trim().is_empty());
        }

        if let Ok(timeout) = std::env::var("PAYGUARD_SCORING_TIMEOUT_MS") {
            self.remote.timeout_ms = parse_var("PAYGUARD_SCORING_TIMEOUT_MS", &timeout)?;
        }

        if let Ok(method) = std::env::var("PAYGUARD_SCORING_METHOD") {
            self.remote.method = match method.to_ascii_uppercase().as_str() {
                "GET" => RequestMethod::Get,
                "POST" => RequestMethod::Post,
                _ => {
                    return Err(Error::InvalidConfig(format!(
                        "PAYGUARD_SCORING_METHOD must be GET or POST, got {}",
                        method
                    )))
                }
            };
        }

        if let Ok(key) = std::env::var("PAYGUARD_SCORING_API_KEY") {
            self.remote.api_key = Some(key);
        }

        if let Ok(verify_at) = std::env::var("PAYGUARD_VERIFY_AT") {
            self.gate.verify_at = parse_var("PAYGUARD_VERIFY_AT", &verify_at)?;
        }

        if let Ok(block_at) = std::env::var("PAYGUARD_BLOCK_AT") {
            self.gate.block_at = parse_var("PAYGUARD_BLOCK_AT", &block_at)?;
        }

        if let Ok(url) = std::env::var("PAYGUARD_ANALYSIS_WS_URL") {
            self.channel.url = Some(url).filter(|u| !u.trim().is_empty());
        }

        if let Ok(dir) = std::env::var("PAYGUARD_SESSION_DIR") {
            self.session_dir = PathBuf::from(dir);
        }

        Ok(self)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.gate.validate()?;
        self.heuristic.validate()?;
        if self.remote.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "remote.timeout_ms must be positive".to_string(),
            ));
        }
        if self.channel.connect_timeout_ms == 0 || self.channel.response_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "channel timeouts must be positive".to_string(),
            ));
        }
        if self.signals.report_window_hours <= 0 {
            return Err(Error::InvalidConfig(
                "signals.report_window_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} is not a valid number: {}", name, value)))
}
