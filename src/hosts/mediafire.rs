//! Mediafire download flow.
//!
//! Mediafire sometimes shows an "uploading" status while it repacks the
//! file server-side; the download button only carries a working link once
//! that clears. The button exposes a direct link, so the transfer itself
//! goes over plain HTTP with the retrying client.

use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use chromiumoxide::page::Page;
use regex::Regex;
use tracing::{debug, info};

use super::{HostContext, HostError, HostHandler, SaveTarget};
use crate::fetch::http::{HttpClient, HttpConfig};
use crate::wait::poll_until;

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[a-zA-Z0-9]+").expect("valid extension regex"));

pub struct Mediafire {
    ctx: HostContext,
}

impl Mediafire {
    pub fn new(ctx: HostContext) -> Self {
        Self { ctx }
    }

    async fn wait_until_ready(&self, page: &Page) -> Result<(), HostError> {
        poll_until(
            "mediafire repack to finish",
            self.ctx.poll_interval,
            self.ctx.wait_timeout,
            || async {
                let uploading: bool = page
                    .evaluate(
                        "document.querySelector('.DownloadStatus.DownloadStatus--uploading') !== null",
                    )
                    .await?
                    .into_value()?;

                Ok::<_, HostError>((!uploading).then_some(()))
            },
        )
        .await
    }

    /// The `.filetype` label is the usual source; older page variants only
    /// carry the filename in the download button's `title`.
    async fn extract_extension(&self, page: &Page) -> Result<String, HostError> {
        let label = query_text(page, "document.querySelector('.filetype')?.innerText ?? ''")
            .await?;

        if let Some(label) = label {
            return parse_filetype_label(&label).ok_or(HostError::BadExtension(label));
        }

        let title = query_text(page, "document.querySelector('.dl-btn-label')?.title ?? ''")
            .await?
            .ok_or(HostError::MissingElement(".filetype / .dl-btn-label"))?;

        extension_from_title(&title).ok_or(HostError::BadExtension(title))
    }
}

#[async_trait]
impl HostHandler for Mediafire {
    async fn fetch(&self, page: &Page, target: &SaveTarget) -> Result<PathBuf, HostError> {
        self.wait_until_ready(page).await?;

        let extension = self.extract_extension(page).await?;
        let dest = target.path_with(&extension);

        if tokio::fs::try_exists(&dest).await? {
            info!(path = %dest.display(), "file already downloaded, skipping");
            return Ok(dest);
        }

        let href = query_text(page, "document.querySelector('#downloadButton')?.href ?? ''")
            .await?
            .ok_or(HostError::MissingElement("#downloadButton"))?;

        debug!(url = %href, "mediafire direct link resolved");

        let config = HttpConfig {
            request_timeout: self.ctx.transfer_timeout,
            ..HttpConfig::default()
        };

        let client = HttpClient::new(config)?;
        let written = client.download_to_file(&href, &dest).await?;

        info!(path = %dest.display(), bytes = written, "mediafire download saved");

        Ok(dest)
    }
}

/// Evaluate an expression yielding a string, `''` standing in for a
/// missing element (CDP reports a JS `null` result as an absent value).
async fn query_text(page: &Page, expr: &str) -> Result<Option<String>, HostError> {
    let text: String = page.evaluate(expr).await?.into_value()?;

    Ok(if text.is_empty() { None } else { Some(text) })
}

fn parse_filetype_label(label: &str) -> Option<String> {
    EXTENSION_RE
        .find(label)
        .map(|m| m.as_str().to_lowercase())
}

fn extension_from_title(title: &str) -> Option<String> {
    let (_, ext) = title.rsplit_once('.')?;

    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(format!(".{}", ext.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filetype_label_yields_lowercased_extension() {
        assert_eq!(parse_filetype_label(".ZIP").as_deref(), Some(".zip"));
        assert_eq!(
            parse_filetype_label("File type: .Rar ").as_deref(),
            Some(".rar")
        );
        assert_eq!(parse_filetype_label(".7z").as_deref(), Some(".7z"));
    }

    #[test]
    fn filetype_label_without_extension_is_rejected() {
        assert_eq!(parse_filetype_label("no extension here"), None);
        assert_eq!(parse_filetype_label(""), None);
    }

    #[test]
    fn title_fallback_takes_last_dot_segment() {
        assert_eq!(
            extension_from_title("Album Name v1.2.FLAC").as_deref(),
            Some(".flac")
        );
        assert_eq!(extension_from_title("archive.zip").as_deref(), Some(".zip"));
    }

    #[test]
    fn title_fallback_rejects_malformed_names() {
        assert_eq!(extension_from_title("no-extension"), None);
        assert_eq!(extension_from_title("trailing-dot."), None);
        assert_eq!(extension_from_title("weird.ex t"), None);
    }
}
