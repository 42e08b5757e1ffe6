//! doujinstyle.com page scraping: album metadata and the download flow.

pub mod album;
pub mod filename;

use chromiumoxide::error::CdpError;
use thiserror::Error;

use crate::session::SessionError;
use crate::wait::WaitError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The album page shows the takedown notice instead of content.
    #[error("album page has been taken down")]
    TakenDown,
    #[error("expected page element missing: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Cdp(#[from] CdpError),
    #[error("unexpected value from page script: {0}")]
    BadValue(#[from] serde_json::Error),
}
