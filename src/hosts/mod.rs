//! File-host provider handlers.
//!
//! The album's download action lands on one of two hosting providers, each
//! with its own download-confirmation DOM flow. Dispatch is an exact match
//! on the resolved page's host name; an unrecognized host is a hard error
//! rather than a silent skip, so a provider change on the site surfaces in
//! the job log instead of reporting false success.

mod mediafire;
mod mega;

pub use mediafire::Mediafire;
pub use mega::Mega;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use thiserror::Error;
use url::Url;

use crate::fetch::http::DownloadError;
use crate::wait::WaitError;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("no handler registered for host {0:?}")]
    UnknownProvider(String),
    #[error("download page URL carries no host name")]
    MissingHost,
    #[error("expected element missing on provider page: {0}")]
    MissingElement(&'static str),
    #[error("could not parse a file extension from {0:?}")]
    BadExtension(String),
    #[error("provider reported a transfer failure: {0}")]
    TransferFailed(String),
    #[error("invalid CDP command: {0}")]
    BadCommand(String),
    #[error(transparent)]
    Http(#[from] DownloadError),
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error(transparent)]
    Cdp(#[from] CdpError),
    #[error("unexpected value from page script: {0}")]
    BadValue(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Mediafire,
    Mega,
}

impl Provider {
    /// Exact host-name match. Anything else is unrecognized.
    pub fn from_host(host: &str) -> Option<Self> {
        match host {
            "www.mediafire.com" | "mediafire.com" => Some(Self::Mediafire),
            "mega.nz" => Some(Self::Mega),
            _ => None,
        }
    }

    pub fn from_url(url: &Url) -> Result<Self, HostError> {
        let host = url.host_str().ok_or(HostError::MissingHost)?;

        Self::from_host(host).ok_or_else(|| HostError::UnknownProvider(host.to_string()))
    }
}

/// Timing knobs shared by the handlers.
#[derive(Debug, Clone)]
pub struct HostContext {
    /// Interval between DOM readiness probes.
    pub poll_interval: Duration,
    /// Upper bound on any readiness wait.
    pub wait_timeout: Duration,
    /// Upper bound on the file transfer itself.
    pub transfer_timeout: Duration,
}

/// Where the downloaded file goes: `<dir>/<name><extension>`, the
/// extension being extracted from the provider page at runtime.
#[derive(Debug, Clone)]
pub struct SaveTarget {
    pub dir: PathBuf,
    pub name: String,
}

impl SaveTarget {
    pub fn path_with(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.name, extension))
    }
}

/// A provider-specific download flow: wait for the host's ready marker,
/// extract the file extension, trigger the transfer, persist the bytes.
#[async_trait]
pub trait HostHandler: Send + Sync {
    async fn fetch(&self, page: &Page, target: &SaveTarget) -> Result<PathBuf, HostError>;
}

pub fn handler_for(provider: Provider, ctx: HostContext) -> Box<dyn HostHandler> {
    match provider {
        Provider::Mediafire => Box::new(Mediafire::new(ctx)),
        Provider::Mega => Box::new(Mega::new(ctx)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mediafire_host_selects_mediafire_and_never_mega() {
        assert_eq!(
            Provider::from_host("www.mediafire.com"),
            Some(Provider::Mediafire)
        );
        assert_eq!(
            Provider::from_host("mediafire.com"),
            Some(Provider::Mediafire)
        );
    }

    #[test]
    fn mega_host_selects_mega() {
        assert_eq!(Provider::from_host("mega.nz"), Some(Provider::Mega));
    }

    #[test]
    fn unrecognized_host_selects_neither() {
        assert_eq!(Provider::from_host("example.com"), None);
        assert_eq!(Provider::from_host("www.mega.nz"), None);
        assert_eq!(Provider::from_host(""), None);
    }

    #[test]
    fn unrecognized_host_fails_loudly_from_url() {
        let url = Url::parse("https://drive.google.com/file/d/abc").unwrap();

        match Provider::from_url(&url) {
            Err(HostError::UnknownProvider(host)) => assert_eq!(host, "drive.google.com"),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }

    #[test]
    fn known_host_dispatches_from_url() {
        let url = Url::parse("https://www.mediafire.com/file/abc/album.zip/file").unwrap();
        assert_eq!(Provider::from_url(&url).unwrap(), Provider::Mediafire);

        let url = Url::parse("https://mega.nz/file/abc#key").unwrap();
        assert_eq!(Provider::from_url(&url).unwrap(), Provider::Mega);
    }

    #[test]
    fn save_target_joins_name_and_extension() {
        let target = SaveTarget {
            dir: PathBuf::from("Downloads"),
            name: "Foo — Bar [MP3]".to_string(),
        };

        assert_eq!(
            target.path_with(".zip"),
            PathBuf::from("Downloads/Foo — Bar [MP3].zip")
        );
    }
}
