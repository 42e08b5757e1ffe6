//! Mega download flow.
//!
//! Mega decrypts the file in the page, so the transfer has to happen
//! inside the browser: the handler routes the browser's downloads into a
//! staging directory next to the destination, clicks whichever download
//! button the page variant shows, watches the in-page transfer status
//! until it reads `Completed`, then moves the settled file into place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::page::Page;
use tracing::{debug, info};
use uuid::Uuid;

use super::{HostContext, HostError, HostHandler, SaveTarget};
use crate::wait::poll_until;

const DEFAULT_EXTENSION: &str = ".zip";
const TRANSFER_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Mega {
    ctx: HostContext,
}

/// The DOM probes the handler runs before a transfer can start, seamed so
/// the wait-then-read ordering is testable without a browser.
#[async_trait]
trait MegaDom: Send + Sync {
    async fn loader_hidden(&self) -> Result<bool, HostError>;
    async fn extension_text(&self) -> Result<String, HostError>;
}

#[async_trait]
impl MegaDom for Page {
    async fn loader_hidden(&self) -> Result<bool, HostError> {
        Ok(self
            .evaluate(
                "document.querySelector('#loading')?.classList.contains('hidden') ?? false",
            )
            .await?
            .into_value()?)
    }

    async fn extension_text(&self) -> Result<String, HostError> {
        Ok(self
            .evaluate("document.querySelector('.extension')?.innerText ?? ''")
            .await?
            .into_value()?)
    }
}

impl Mega {
    pub fn new(ctx: HostContext) -> Self {
        Self { ctx }
    }

    /// The loader overlay gains the `hidden` class once the page is usable.
    /// Reading the extension before that point sees a skeleton DOM, so the
    /// wait always runs first.
    async fn resolve_extension(&self, dom: &dyn MegaDom) -> Result<String, HostError> {
        poll_until(
            "mega loader to clear",
            self.ctx.poll_interval,
            self.ctx.wait_timeout,
            || async { Ok::<_, HostError>(dom.loader_hidden().await?.then_some(())) },
        )
        .await?;

        let ext = dom.extension_text().await?;

        Ok(if ext.trim().is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            normalize_extension(&ext)
        })
    }

    async fn transfer(
        &self,
        page: &Page,
        stage: &Path,
        dest: &Path,
    ) -> Result<PathBuf, HostError> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(stage.to_string_lossy())
            .build()
            .map_err(HostError::BadCommand)?;

        page.execute(params).await?;

        let clicked: bool = page
            .evaluate(
                "(() => { \
                    for (const sel of ['.js-default-download', '.fm-download-as-zip']) { \
                        const el = document.querySelector(sel); \
                        if (el) { el.click(); return true; } \
                    } \
                    return false; \
                })()",
            )
            .await?
            .into_value()?;

        if !clicked {
            return Err(HostError::MissingElement(
                ".js-default-download / .fm-download-as-zip",
            ));
        }

        debug!("mega transfer started");

        poll_until(
            "mega transfer to complete",
            TRANSFER_POLL_INTERVAL,
            self.ctx.transfer_timeout,
            || async {
                let warning: String = page
                    .evaluate(
                        "document.querySelector('.default-warning .txt')?.innerText ?? ''",
                    )
                    .await?
                    .into_value()?;

                let warning = warning.trim();
                if !warning.is_empty() {
                    return Err(HostError::TransferFailed(warning.to_string()));
                }

                let status: String = page
                    .evaluate(
                        "document.querySelector('.transfer-task-status')?.innerText ?? ''",
                    )
                    .await?
                    .into_value()?;

                Ok((status == "Completed").then_some(()))
            },
        )
        .await?;

        // The page reports completion slightly before the browser finishes
        // flushing the file, so wait for the staged file to settle too.
        let staged = poll_until(
            "staged file to settle",
            Duration::from_millis(500),
            self.ctx.wait_timeout,
            || async { settled_file(stage).await },
        )
        .await?;

        tokio::fs::rename(&staged, dest).await?;

        Ok(dest.to_path_buf())
    }
}

#[async_trait]
impl HostHandler for Mega {
    async fn fetch(&self, page: &Page, target: &SaveTarget) -> Result<PathBuf, HostError> {
        let extension = self.resolve_extension(page).await?;
        let dest = target.path_with(&extension);

        if tokio::fs::try_exists(&dest).await? {
            info!(path = %dest.display(), "file already downloaded, skipping");
            return Ok(dest);
        }

        // Stage under the destination directory so the final rename stays
        // on one filesystem.
        let stage = target.dir.join(format!(".inflight-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&stage).await?;

        let result = self.transfer(page, &stage, &dest).await;

        if let Err(e) = tokio::fs::remove_dir_all(&stage).await {
            debug!(error = %e, "could not remove staging directory");
        }

        if result.is_ok() {
            info!(path = %dest.display(), "mega download saved");
        }

        result
    }
}

fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();

    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}

/// A single regular file with no in-progress `.crdownload` marker.
async fn settled_file(dir: &Path) -> Result<Option<PathBuf>, HostError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if path
            .extension()
            .is_some_and(|ext| ext == "crdownload")
        {
            return Ok(None);
        }

        if entry.file_type().await?.is_file() {
            found = Some(path);
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> HostContext {
        HostContext {
            poll_interval: Duration::from_millis(10),
            wait_timeout: Duration::from_secs(5),
            transfer_timeout: Duration::from_secs(5),
        }
    }

    /// Records the order of DOM probes; the loader clears on the nth poll.
    struct ScriptedDom {
        polls_until_clear: usize,
        polls: AtomicUsize,
        ext: &'static str,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedDom {
        fn new(polls_until_clear: usize, ext: &'static str) -> Self {
            Self {
                polls_until_clear,
                polls: AtomicUsize::new(0),
                ext,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MegaDom for ScriptedDom {
        async fn loader_hidden(&self) -> Result<bool, HostError> {
            self.calls.lock().unwrap().push("loader");
            Ok(self.polls.fetch_add(1, Ordering::SeqCst) + 1 >= self.polls_until_clear)
        }

        async fn extension_text(&self) -> Result<String, HostError> {
            self.calls.lock().unwrap().push("extension");
            Ok(self.ext.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn extension_is_read_only_after_loader_clears() {
        let dom = ScriptedDom::new(3, ".RAR");
        let mega = Mega::new(ctx());

        let ext = mega.resolve_extension(&dom).await.unwrap();
        assert_eq!(ext, ".rar");

        let calls = dom.calls.lock().unwrap();
        assert_eq!(*calls, vec!["loader", "loader", "loader", "extension"]);
    }

    #[tokio::test(start_paused = true)]
    async fn extension_is_never_read_while_loader_stays() {
        let dom = ScriptedDom::new(usize::MAX, ".zip");
        let mega = Mega::new(ctx());

        let result = mega.resolve_extension(&dom).await;

        assert!(matches!(result, Err(HostError::Wait(_))));
        assert!(!dom.calls.lock().unwrap().contains(&"extension"));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_extension_falls_back_to_zip() {
        let dom = ScriptedDom::new(1, "  ");
        let mega = Mega::new(ctx());

        assert_eq!(mega.resolve_extension(&dom).await.unwrap(), ".zip");
    }

    #[test]
    fn extension_is_normalized_with_leading_dot() {
        assert_eq!(normalize_extension(".zip"), ".zip");
        assert_eq!(normalize_extension("rar"), ".rar");
        assert_eq!(normalize_extension(" .7Z "), ".7z");
    }

    #[tokio::test]
    async fn settled_file_ignores_in_progress_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("album.zip.crdownload");
        tokio::fs::write(&partial, b"partial").await.unwrap();

        assert!(settled_file(dir.path()).await.unwrap().is_none());

        tokio::fs::rename(&partial, dir.path().join("album.zip"))
            .await
            .unwrap();

        let settled = settled_file(dir.path()).await.unwrap().unwrap();
        assert_eq!(settled.file_name().unwrap(), "album.zip");
    }

    #[tokio::test]
    async fn settled_file_empty_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(settled_file(dir.path()).await.unwrap().is_none());
    }
}
