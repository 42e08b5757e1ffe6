//! In-memory pending list and the worker pool that drains it.

pub mod runner;

pub use runner::{FetchExecutor, Job, JobExecutor, JobRunner, SubmitError};

use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("index {index} out of range for pending list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// The ordered list of submitted album identifiers awaiting processing.
///
/// Purely in-memory: a restart loses it. Every mutation bumps a revision
/// broadcast over a `watch` channel, which the SSE endpoint uses to know
/// when to re-render. Identifiers are not deduplicated.
pub struct PendingList {
    items: Mutex<Vec<String>>,
    revision: watch::Sender<u64>,
}

impl PendingList {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);

        Self {
            items: Mutex::new(Vec::new()),
            revision,
        }
    }

    /// Append an identifier, returning its index.
    pub fn push(&self, album_id: String) -> usize {
        let index = {
            let mut items = self.lock();
            items.push(album_id);
            items.len() - 1
        };

        self.bump();
        index
    }

    /// Remove by index. Out-of-range is an error, never a truncation.
    pub fn remove(&self, index: usize) -> Result<String, QueueError> {
        let removed = {
            let mut items = self.lock();

            if index >= items.len() {
                return Err(QueueError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }

            items.remove(index)
        };

        self.bump();
        Ok(removed)
    }

    /// Remove the first occurrence of an identifier, if present. Used when
    /// a download job finishes.
    pub fn remove_album(&self, album_id: &str) -> bool {
        let removed = {
            let mut items = self.lock();

            match items.iter().position(|item| item == album_id) {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            self.bump();
        }

        removed
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Receiver that resolves whenever the list changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.items.lock().expect("pending list mutex poisoned")
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl Default for PendingList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_exactly_one_element() {
        let list = PendingList::new();

        assert_eq!(list.push("100".into()), 0);
        assert_eq!(list.push("200".into()), 1);

        assert_eq!(list.snapshot(), vec!["100", "200"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_preserves_relative_order() {
        let list = PendingList::new();
        for id in ["a", "b", "c", "d"] {
            list.push(id.into());
        }

        assert_eq!(list.remove(1).unwrap(), "b");
        assert_eq!(list.snapshot(), vec!["a", "c", "d"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn remove_out_of_range_fails_without_truncating() {
        let list = PendingList::new();
        list.push("a".into());

        match list.remove(1) {
            Err(QueueError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 1);
                assert_eq!(len, 1);
            }
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }

        assert_eq!(list.snapshot(), vec!["a"]);
    }

    #[test]
    fn remove_album_takes_first_occurrence() {
        let list = PendingList::new();
        list.push("x".into());
        list.push("y".into());
        list.push("x".into());

        assert!(list.remove_album("x"));
        assert_eq!(list.snapshot(), vec!["y", "x"]);

        assert!(!list.remove_album("missing"));
    }

    #[test]
    fn mutations_bump_the_revision() {
        let list = PendingList::new();
        let rx = list.subscribe();

        let before = *rx.borrow();
        list.push("a".into());
        list.remove(0).unwrap();

        assert_eq!(*rx.borrow(), before + 2);
    }
}
