//! Cancellation and deadline handling for external I/O.
//!
//! Every file read/write and store call takes an `IoScope`. A scope that is
//! cancelled or runs out of time turns the pending call into an I/O error
//! (`Interrupted` / `TimedOut`).

use std::future::Future;
use std::time::Duration;

use harness_common::{HarnessError, Result};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct IoScope {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl IoScope {
    pub fn new(cancel: CancellationToken, timeout: Option<Duration>) -> Self {
        Self { cancel, timeout }
    }

    /// No deadline, never cancelled unless the returned token is
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout: Some(timeout),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `fut` under this scope's cancellation token and deadline
    pub async fn run<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(HarnessError::cancelled(what)),
                result = fut => result,
            }
        };

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(result) => result,
                Err(_) => Err(HarnessError::timed_out(what)),
            },
            None => guarded.await,
        }
    }
}
