//! Bounded polling for conditions that have no event to subscribe to.
//!
//! Page readiness on the file hosts is only observable by re-probing the
//! DOM, so every such wait goes through [`poll_until`]: a probe runs at a
//! fixed interval until it yields a value or the deadline passes. The
//! deadline makes a stuck page a [`WaitError::TimedOut`] instead of a hung
//! job.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out after {timeout:?} waiting for {what}")]
    TimedOut {
        what: &'static str,
        timeout: Duration,
    },
}

/// Run `probe` every `interval` until it returns `Some`, erroring out once
/// `timeout` has elapsed. Probe errors propagate immediately.
pub async fn poll_until<T, E, F, Fut>(
    what: &'static str,
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: From<WaitError>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }

        if Instant::now() + interval > deadline {
            return Err(WaitError::TimedOut { what, timeout }.into());
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Error)]
    enum TestError {
        #[error(transparent)]
        Wait(#[from] WaitError),
        #[error("probe blew up")]
        Probe,
    }

    #[tokio::test(start_paused = true)]
    async fn returns_value_once_probe_succeeds() {
        let calls = AtomicUsize::new(0);

        let result: Result<u32, TestError> = poll_until(
            "test condition",
            Duration::from_millis(100),
            Duration::from_secs(10),
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) >= 2 {
                    Ok(Some(42))
                } else {
                    Ok(None)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_probe_never_succeeds() {
        let result: Result<u32, TestError> = poll_until(
            "never ready",
            Duration::from_millis(100),
            Duration::from_secs(1),
            || async { Ok(None) },
        )
        .await;

        match result {
            Err(TestError::Wait(WaitError::TimedOut { what, .. })) => {
                assert_eq!(what, "never ready");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_propagate_immediately() {
        let calls = AtomicUsize::new(0);

        let result: Result<u32, TestError> = poll_until(
            "failing probe",
            Duration::from_millis(100),
            Duration::from_secs(10),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Probe)
            },
        )
        .await;

        assert!(matches!(result, Err(TestError::Probe)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
