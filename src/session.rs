//! Browser session manager.
//!
//! Owns the browser process and its CDP event handler task. A session is
//! acquired per download job and released in reverse order of acquisition:
//! pages are closed by their users, then [`BrowserSession::close`] shuts
//! down the browser and reaps the handler task.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unsupported browser engine: {0:?} (expected chromium, chrome or edge)")]
    UnsupportedEngine(String),
    #[error("could not launch browser: {0}")]
    Launch(String),
    #[error("page did not open within {0:?}")]
    OpenTimeout(Duration),
    #[error(transparent)]
    Cdp(#[from] CdpError),
}

/// Recognized browser engines. chromiumoxide drives anything speaking CDP,
/// so the set is the Chromium family; parsing any other name fails before a
/// process is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserEngine {
    Chromium,
    Chrome,
    Edge,
}

impl BrowserEngine {
    pub fn parse(name: &str) -> Result<Self, SessionError> {
        match name {
            "chromium" => Ok(Self::Chromium),
            "chrome" => Ok(Self::Chrome),
            "edge" => Ok(Self::Edge),
            other => Err(SessionError::UnsupportedEngine(other.to_string())),
        }
    }

    /// Executable override for non-default engines. `Chromium` relies on
    /// chromiumoxide's own detection.
    fn executable(self) -> Option<&'static str> {
        match self {
            Self::Chromium => None,
            Self::Chrome => Some("google-chrome"),
            Self::Edge => Some("microsoft-edge"),
        }
    }
}

impl std::str::FromStr for BrowserEngine {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    timeout: Duration,
}

impl BrowserSession {
    /// Launch a browser and start draining its CDP event stream.
    ///
    /// The engine name is validated before anything is spawned.
    pub async fn launch(
        engine: BrowserEngine,
        headless: bool,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder().request_timeout(timeout);

        if !headless {
            builder = builder.with_head();
        }

        if let Some(exe) = engine.executable() {
            builder = builder.chrome_executable(exe);
        }

        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        debug!(?engine, headless, "browser launched");

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler,
            timeout,
        })
    }

    /// Open a new page on `url`, bounded by the session timeout.
    pub async fn open_page(&self, url: &str) -> Result<Page, SessionError> {
        let page = tokio::time::timeout(self.timeout, self.browser.new_page(url))
            .await
            .map_err(|_| SessionError::OpenTimeout(self.timeout))??;

        page.wait_for_navigation().await?;

        Ok(page)
    }

    /// All pages currently open in the browser, including tabs opened by
    /// in-page scripts.
    pub async fn pages(&self) -> Result<Vec<Page>, SessionError> {
        Ok(self.browser.pages().await?)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shut down in reverse order of acquisition: browser first, then the
    /// handler task (which ends once the browser's event stream closes).
    pub async fn close(mut self) -> Result<(), SessionError> {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }

        let _ = self.browser.wait().await;

        if tokio::time::timeout(Duration::from_secs(5), &mut self.handler)
            .await
            .is_err()
        {
            warn!("CDP handler task still running after browser exit, aborting it");
            self.handler.abort();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_engine_names_parse() {
        assert_eq!(
            BrowserEngine::parse("chromium").unwrap(),
            BrowserEngine::Chromium
        );
        assert_eq!(
            BrowserEngine::parse("chrome").unwrap(),
            BrowserEngine::Chrome
        );
        assert_eq!(BrowserEngine::parse("edge").unwrap(), BrowserEngine::Edge);
    }

    #[test]
    fn unknown_engine_name_is_rejected() {
        for name in ["firefox", "webkit", "CHROMIUM", ""] {
            match BrowserEngine::parse(name) {
                Err(SessionError::UnsupportedEngine(got)) => assert_eq!(got, name),
                other => panic!("expected UnsupportedEngine for {name:?}, got {other:?}"),
            }
        }
    }
}
