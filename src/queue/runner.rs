//! Bounded job queue and worker pool.
//!
//! Submissions go through a bounded mpsc channel; a dispatch loop takes a
//! semaphore permit per job (suspending when all slots are busy, never
//! spinning) and runs the job on its own task. Whatever the outcome, the
//! album is removed from the pending list when its job ends.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info};
use uuid::Uuid;

use super::PendingList;
use crate::config::Config;
use crate::fetch::{self, FetchError};

#[derive(Debug, Clone)]
pub struct Job {
    pub album_id: String,
    pub trace_id: Uuid,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("job queue is full")]
    QueueFull,
    #[error("job queue is closed")]
    Closed,
}

/// Seam between the queue and the download flow, so the queue is testable
/// without a browser.
#[async_trait]
pub trait JobExecutor: Send + Sync + 'static {
    async fn execute(&self, job: &Job) -> Result<PathBuf, FetchError>;
}

/// Production executor: one full scrape-and-download per job.
pub struct FetchExecutor {
    config: Arc<Config>,
}

impl FetchExecutor {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl JobExecutor for FetchExecutor {
    async fn execute(&self, job: &Job) -> Result<PathBuf, FetchError> {
        fetch::run_album(&self.config, &job.album_id).await
    }
}

pub struct JobRunner {
    tx: mpsc::Sender<Job>,
}

impl JobRunner {
    /// Spawn the dispatch loop. `capacity` bounds the backlog of accepted
    /// jobs; `concurrency` caps how many run at once.
    pub fn spawn(
        executor: Arc<dyn JobExecutor>,
        pending: Arc<PendingList>,
        capacity: usize,
        concurrency: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity);
        let semaphore = Arc::new(Semaphore::new(concurrency));

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };

                let executor = executor.clone();
                let pending = pending.clone();

                tokio::spawn(async move {
                    let album_id = job.album_id.clone();
                    let trace_id = job.trace_id;

                    info!(%album_id, %trace_id, "download job started");

                    match executor.execute(&job).await {
                        Ok(saved) => {
                            info!(%album_id, %trace_id, saved = %saved.display(), "download job finished");
                        }
                        Err(e) => {
                            error!(%album_id, %trace_id, error = %e, "download job failed");
                        }
                    }

                    pending.remove_album(&album_id);
                    drop(permit);
                });
            }
        });

        Self { tx }
    }

    /// Accept a job or fail fast when the backlog is full.
    pub fn submit(&self, album_id: String) -> Result<(), SubmitError> {
        let job = Job {
            album_id,
            trace_id: Uuid::new_v4(),
        };

        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}
