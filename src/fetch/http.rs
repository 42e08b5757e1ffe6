//! HTTP client for direct-link downloads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("connection timeout")]
    Timeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DownloadError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(1800),
            max_retries: 3,
            user_agent: "doujindl/0.1.0".to_string(),
        }
    }
}

/// HTTP downloader
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| DownloadError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Download `url` to `dest` with retry. Bytes are streamed into a
    /// `.part` sibling which is renamed into place only on success, so a
    /// failed attempt never leaves a half-written destination file.
    pub async fn download_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        let part = part_path(dest);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.download_once(url, &part).await {
                Ok(written) => {
                    tokio::fs::rename(&part, dest).await?;

                    if attempts > 1 {
                        debug!(url, attempts, "download succeeded after retry");
                    }

                    return Ok(written);
                }
                Err(e) => {
                    let _ = tokio::fs::remove_file(&part).await;
                    let last_error = e.to_string();

                    if attempts >= self.config.max_retries {
                        warn!(url, attempts, error = %last_error, "download failed after retries");
                        return Err(DownloadError::RequestFailed(format!(
                            "failed after {} attempts: {}",
                            attempts, last_error
                        )));
                    }

                    warn!(url, attempts, error = %last_error, "download failed, retrying");

                    // Exponential backoff: 1s, 2s, 4s
                    let backoff = Duration::from_secs(2u64.pow(attempts - 1));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn download_once(&self, url: &str, part: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(DownloadError::RequestFailed(format!(
                "unexpected status {} for {}",
                response.status(),
                url
            )));
        }

        let mut file = tokio::fs::File::create(part).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk.map_err(map_reqwest_error)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;

        Ok(written)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> DownloadError {
    if e.is_timeout() {
        DownloadError::Timeout
    } else {
        DownloadError::RequestFailed(e.to_string())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("Downloads/album.zip")),
            PathBuf::from("Downloads/album.zip.part")
        );
    }

    #[test]
    fn client_builds_with_defaults() {
        let client = HttpClient::new(HttpConfig::default());
        assert!(client.is_ok());
    }
}
