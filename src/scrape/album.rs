//! Album page flow: open, takedown check, download-tab capture.

use std::time::Duration;

use chromiumoxide::page::Page;

use super::ScrapeError;
use crate::session::BrowserSession;
use crate::wait::poll_until;

const ALBUM_URL_PREFIX: &str = "https://doujinstyle.com/?p=page&type=1&id=";

/// Text shown in place of content when an album has been taken down.
const TAKEDOWN_NOTICE: &str = "Insufficient information to display content.";

pub fn album_url(album_id: &str) -> String {
    format!("{ALBUM_URL_PREFIX}{album_id}")
}

pub async fn is_taken_down(page: &Page) -> Result<bool, ScrapeError> {
    let taken_down: bool = page
        .evaluate(format!(
            "document.querySelector('h3')?.innerText === {TAKEDOWN_NOTICE:?}"
        ))
        .await?
        .into_value()?;

    Ok(taken_down)
}

/// Trigger the album's download action and capture the tab it opens.
///
/// The site opens the file host in a new tab, so after clicking
/// `#downloadForm` we watch the browser's page set for a tab that is not
/// the album page and has navigated somewhere real.
pub async fn open_download_page(
    session: &BrowserSession,
    album_page: &Page,
    poll_interval: Duration,
    wait_timeout: Duration,
) -> Result<Page, ScrapeError> {
    let origin = album_page.target_id().clone();

    let clicked: bool = album_page
        .evaluate(
            "(() => { \
                const el = document.querySelector('#downloadForm'); \
                if (!el) return false; \
                el.click(); \
                return true; \
            })()",
        )
        .await?
        .into_value()?;

    if !clicked {
        return Err(ScrapeError::MissingField("#downloadForm"));
    }

    let download_page = poll_until(
        "download tab to open",
        poll_interval,
        wait_timeout,
        || async {
            for page in session.pages().await? {
                if page.target_id() == &origin {
                    continue;
                }

                match page.url().await? {
                    Some(url) if url != "about:blank" => return Ok(Some(page)),
                    _ => continue,
                }
            }

            Ok::<_, ScrapeError>(None)
        },
    )
    .await?;

    download_page.wait_for_navigation().await?;

    Ok(download_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn album_url_appends_identifier() {
        assert_eq!(
            album_url("12345"),
            "https://doujinstyle.com/?p=page&type=1&id=12345"
        );
    }
}
