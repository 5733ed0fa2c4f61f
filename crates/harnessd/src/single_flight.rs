//! Single-flight load groups.
//!
//! The first caller for a key spawns the load; callers arriving while it is
//! still running await the same shared result. The load runs as its own
//! task, so it completes (or fails) even if the caller that started it goes
//! away. The key is released when the load finishes, after the load body
//! has run, so a cache written by the body is visible before the next
//! caller can start another load.

use futures::future::{BoxFuture, FutureExt, Shared};
use harness_common::{HarnessError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T>>>;
type InFlight<K, T> = Arc<Mutex<HashMap<K, SharedLoad<T>>>>;

pub struct SingleFlight<K, T: Clone> {
    inflight: InFlight<K, T>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `load` for `key` unless a load for it is already in flight, in
    /// which case wait for that one instead
    pub async fn run<F, Fut>(&self, key: K, load: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(&key) {
                Some(pending) => {
                    debug!("Joining in-flight load for {:?}", key);
                    pending.clone()
                }
                None => {
                    let pending = spawn_load(Arc::clone(&self.inflight), key.clone(), load());
                    inflight.insert(key, pending.clone());
                    pending
                }
            }
        };

        shared.await
    }

    /// Number of loads currently running
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_load<K, T, Fut>(inflight: InFlight<K, T>, key: K, load: Fut) -> SharedLoad<T>
where
    K: Eq + Hash + Send + 'static,
    T: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let result = load.await;
        lock(&inflight).remove(&key);
        result
    });

    async move {
        match task.await {
            Ok(result) => result,
            Err(join_error) => Err(HarnessError::from(io::Error::new(
                io::ErrorKind::Other,
                format!("load task aborted: {}", join_error),
            ))),
        }
    }
    .boxed()
    .shared()
}

fn lock<K, T>(inflight: &Mutex<HashMap<K, T>>) -> MutexGuard<'_, HashMap<K, T>> {
    inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let group: SingleFlight<&'static str, u32> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let callers = (0..8).map(|_| {
            let calls = Arc::clone(&calls);
            group.run("stage", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(42)
            })
        });
        let results = futures::future::join_all(callers).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| matches!(r, Ok(42))));
        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_shared_then_retried() {
        let group: SingleFlight<&'static str, u32> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err::<u32, _>(HarnessError::from(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "denied",
                )))
            }
        };

        let (a, b) = tokio::join!(
            group.run("stage", failing(Arc::clone(&calls))),
            group.run("stage", failing(Arc::clone(&calls)))
        );
        assert_eq!(a.unwrap_err().io_kind(), Some(io::ErrorKind::PermissionDenied));
        assert_eq!(b.unwrap_err().io_kind(), Some(io::ErrorKind::PermissionDenied));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Nothing is remembered after a failure.
        let _ = group.run("stage", failing(Arc::clone(&calls))).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_load_independently() {
        let group: SingleFlight<String, String> = SingleFlight::new();
        let (a, b) = tokio::join!(
            group.run("s1".to_string(), || async { Ok("one".to_string()) }),
            group.run("s2".to_string(), || async { Ok("two".to_string()) })
        );
        assert_eq!(a.unwrap(), "one");
        assert_eq!(b.unwrap(), "two");
    }
}
