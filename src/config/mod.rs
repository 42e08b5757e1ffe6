//! Configuration management
//!
//! Settings are loaded in layers:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file (default: `config/doujindl.toml`)
//! 3. Environment variables (highest priority)
//!
//! Environment overrides use the pattern `DOUJINDL__<section>__<key>`,
//! e.g. `DOUJINDL__SERVER__BIND_ADDR=0.0.0.0:9000` or
//! `DOUJINDL__DOWNLOAD__CONCURRENT_JOBS=2`. The config file path itself
//! can be overridden with `DOUJINDL_CONFIG`.

mod models;
mod sources;

pub use models::{BrowserConfig, Config, DownloadConfig, ServerConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl Config {
    /// Load configuration from all sources (file + environment).
    pub fn load() -> Result<Self, ConfigError> {
        Ok(sources::load()?)
    }

    /// Load configuration from a specific path.
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        Ok(sources::load_from_sources(path)?)
    }
}
