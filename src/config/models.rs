use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Browser automation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    /// Engine name: one of `chromium`, `chrome`, `edge`
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Default timeout applied to CDP requests and page opens
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Interval between DOM readiness probes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on any single DOM readiness wait
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

impl BrowserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            headless: default_headless(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

/// Download configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Directory downloads land in, created on demand
    #[serde(default = "default_download_root")]
    pub root: PathBuf,
    /// Maximum number of downloads running at once
    #[serde(default = "default_concurrent_jobs")]
    pub concurrent_jobs: usize,
    /// Capacity of the pending job queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound on a single file transfer
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
}

impl DownloadConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            root: default_download_root(),
            concurrent_jobs: default_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:5500".parse().unwrap()
}

fn default_engine() -> String {
    "chromium".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_wait_timeout_ms() -> u64 {
    120_000
}

fn default_download_root() -> PathBuf {
    PathBuf::from("Downloads")
}

fn default_concurrent_jobs() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    100
}

fn default_transfer_timeout_secs() -> u64 {
    1_800
}
