//! Configuration loading and parsing
//!
//! The bridge takes no command-line flags. When `CAN_BRIDGE_CONFIG` names a
//! TOML file it replaces the built-in topology; otherwise the default
//! three-interface ring is used.

use anyhow::{anyhow, bail, Context, Result};
use can_bridge_core::{BridgeConfig, RoutingPolicy, MAX_POLL_TIMEOUT_MS};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming an optional configuration file
pub const CONFIG_ENV: &str = "CAN_BRIDGE_CONFIG";

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set ("error" .. "trace")
    pub level: Option<String>,
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        match &self.level {
            Some(level) => level
                .parse()
                .map_err(|_| anyhow!("Invalid log level: {:?}", level)),
            None => Ok(LevelFilter::Info),
        }
    }
}

/// Load the file named by `CAN_BRIDGE_CONFIG`, or the defaults
pub fn resolve_config() -> Result<AppConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => load_config(Path::new(&path)),
        None => Ok(AppConfig::default()),
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    // Catch topology mistakes before any interface is touched
    RoutingPolicy::from_config(&config.bridge)
        .with_context(|| format!("Invalid routing in config file: {:?}", path))?;
    if !config.bridge.poll_timeout_within_limit() {
        bail!(
            "poll_timeout_ms = {} in {:?} exceeds the maximum of {} ms",
            config.bridge.poll_timeout_ms,
            path,
            MAX_POLL_TIMEOUT_MS
        );
    }
    config.logging.level_filter()?;

    Ok(config)
}
