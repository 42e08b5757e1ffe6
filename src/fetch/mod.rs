//! Per-album download orchestration.
//!
//! One job owns one browser session: open the album page, derive the
//! destination filename from its metadata, trigger the download action,
//! match the tab it opens to a provider handler, and let the handler
//! persist the file. The session is released in reverse order of
//! acquisition on every exit path.

pub mod http;

use std::path::PathBuf;

use chromiumoxide::error::CdpError;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::hosts::{self, HostContext, HostError, Provider, SaveTarget};
use crate::scrape::{ScrapeError, album, filename};
use crate::session::{BrowserEngine, BrowserSession, SessionError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("download page URL is malformed: {0}")]
    BadDownloadUrl(#[from] url::ParseError),
    #[error(transparent)]
    Cdp(#[from] CdpError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run the full scrape-and-download flow for one album identifier.
/// Returns the path the file was saved under.
pub async fn run_album(config: &Config, album_id: &str) -> Result<PathBuf, FetchError> {
    tokio::fs::create_dir_all(&config.download.root).await?;

    // Validated before anything is launched.
    let engine = BrowserEngine::parse(&config.browser.engine)?;

    let session = BrowserSession::launch(
        engine,
        config.browser.headless,
        config.browser.timeout(),
    )
    .await?;

    let result = run_with_session(&session, config, album_id).await;

    if let Err(e) = session.close().await {
        warn!(album_id, error = %e, "browser session did not shut down cleanly");
    }

    result
}

async fn run_with_session(
    session: &BrowserSession,
    config: &Config,
    album_id: &str,
) -> Result<PathBuf, FetchError> {
    let album_page = session.open_page(&album::album_url(album_id)).await?;

    if album::is_taken_down(&album_page).await? {
        return Err(ScrapeError::TakenDown.into());
    }

    let name = filename::derive(&album_page).await?;

    info!(album_id, name, "album metadata scraped");

    let download_page = album::open_download_page(
        session,
        &album_page,
        config.browser.poll_interval(),
        config.browser.wait_timeout(),
    )
    .await?;

    let url = download_page
        .url()
        .await?
        .ok_or(HostError::MissingHost)?;
    let url = Url::parse(&url)?;

    let provider = Provider::from_url(&url)?;

    info!(album_id, %url, ?provider, "download page resolved");

    let handler = hosts::handler_for(
        provider,
        HostContext {
            poll_interval: config.browser.poll_interval(),
            wait_timeout: config.browser.wait_timeout(),
            transfer_timeout: config.download.transfer_timeout(),
        },
    );

    let target = SaveTarget {
        dir: config.download.root.clone(),
        name,
    };

    let saved = handler.fetch(&download_page, &target).await?;

    // Pages close before the session does.
    if let Err(e) = download_page.close().await {
        warn!(album_id, error = %e, "download page did not close cleanly");
    }
    if let Err(e) = album_page.close().await {
        warn!(album_id, error = %e, "album page did not close cleanly");
    }

    Ok(saved)
}
