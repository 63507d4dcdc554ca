//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use therma_decoder::{MonitorConfig, PollerConfig};
use thiserror::Error;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub poll: PollerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub decoding: DecodingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Serial port settings; unset values fall back to per-command defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkConfig {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub parity: Option<Parity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DecodingConfig {
    /// Register definitions file; the built-in table is used if unset
    pub definitions: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// JSON-lines file records are appended to (default: stdout)
    pub path: Option<PathBuf>,
}

/// Port parameters once file values and flags are merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No serial port given (use --port or [link] port)")]
    MissingPort,

    #[error("Baud rate must be positive")]
    ZeroBaudRate,

    #[error("Poll interval must be at least one second")]
    ZeroPollInterval,
}

impl LinkConfig {
    /// Merge with a command-line port override and defaults for the protocol in use
    pub fn resolve(
        &self,
        port: Option<&str>,
        default_baud: u32,
        default_parity: Parity,
    ) -> std::result::Result<PortSettings, ConfigError> {
        let port = port
            .map(str::to_string)
            .or_else(|| self.port.clone())
            .ok_or(ConfigError::MissingPort)?;
        let baud_rate = self.baud_rate.unwrap_or(default_baud);
        if baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        Ok(PortSettings {
            port,
            baud_rate,
            parity: self.parity.unwrap_or(default_parity),
        })
    }
}

impl AppConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.link.baud_rate == Some(0) {
            return Err(ConfigError::ZeroBaudRate);
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}
