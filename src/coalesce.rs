//! Keyed single-flight deduplication of in-progress asynchronous work.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::warn;

type Inflight<T> = Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>;

/// At most one concurrent computation per key.
///
/// The first caller for a key installs the work; everyone arriving while it
/// is in flight awaits the same shared future and observes the same outcome.
/// The map entry is removed when the work settles, so later callers start
/// fresh — nothing is cached here, success or failure. Fallible work is
/// expressed by choosing `T = Result<V, E>` with a cloneable error.
pub struct Coalescer<T: Clone> {
    inflight: Arc<Inflight<T>>,
}

impl<T: Clone + Send + Sync + 'static> Coalescer<T> {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs `work` under `key`, or joins the in-flight run for that key.
    pub async fn run<F>(&self, key: &str, work: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut inflight = lock(&self.inflight);
            if let Some(existing) = inflight.get(key) {
                existing.clone()
            } else {
                // The wrapped future clears its own slot once the work
                // settles, no matter which joiner drives it to completion.
                let slot = self.inflight.clone();
                let slot_key = key.to_string();
                let shared = async move {
                    let outcome = work.await;
                    lock(&slot).remove(&slot_key);
                    outcome
                }
                .boxed()
                .shared();
                inflight.insert(key.to_string(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Number of keys currently in flight.
    pub fn len(&self) -> usize {
        lock(&self.inflight).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(inflight: &Inflight<T>) -> std::sync::MutexGuard<'_, HashMap<String, Shared<BoxFuture<'static, T>>>> {
    match inflight.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("coalescer lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let coalescer = Arc::new(Coalescer::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = coalescer.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .run("example.com", async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        7u32
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(coalescer.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let coalescer = Coalescer::<u32>::new();
        let a = coalescer.run("a.example", async { 1 }).await;
        let b = coalescer.run("b.example", async { 2 }).await;
        assert_eq!((a, b), (1, 2));
    }

    #[tokio::test]
    async fn test_failures_are_shared_but_not_cached() {
        let coalescer = Arc::new(Coalescer::<Result<u32, String>>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        // First window: every concurrent caller sees the same failure.
        let mut handles = Vec::new();
        for _ in 0..4 {
            let coalescer = coalescer.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .run("example.com", async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err::<u32, _>("boom".to_string())
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err("boom".to_string()));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // The failure settled and was removed: a retry runs fresh work.
        let retried = coalescer.run("example.com", async { Ok(3u32) }).await;
        assert_eq!(retried, Ok(3));
    }

    #[tokio::test]
    async fn test_sequential_calls_run_fresh_work() {
        let coalescer = Coalescer::<u32>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            let runs = runs.clone();
            let got = coalescer
                .run("example.com", async move { runs.fetch_add(1, Ordering::SeqCst) as u32 + 1 })
                .await;
            assert_eq!(got, expected);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
