//! Single-Flight Module
//!
//! Per-key deduplication of concurrent work: while a flight for a key is in
//! progress, later callers join it and receive a clone of the same result
//! instead of starting their own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

struct Flight<T> {
    rx: watch::Receiver<Option<T>>,
    callers: Arc<AtomicUsize>,
}

// == Single Flight ==
/// Coalesces concurrent invocations of the same keyed operation.
///
/// The flight body is spawned onto the runtime, so it always runs to
/// completion (and performs its cache write-through) even if the caller that
/// started it is cancelled mid-await. The flight slot is removed after the
/// body finishes and before its result is broadcast, so a caller arriving
/// later starts a fresh flight.
pub struct SingleFlight<T> {
    calls: Arc<Mutex<HashMap<String, Flight<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs `fut` for `key`, unless a flight for `key` is already in
    /// progress, in which case the caller joins it.
    ///
    /// Returns the flight result and a `shared` flag that is true iff more
    /// than one caller observed the flight.
    pub async fn run<F>(&self, key: &str, fut: F) -> (T, bool)
    where
        F: std::future::Future<Output = T> + Send + 'static,
    {
        let (mut rx, callers, leader) = {
            let mut calls = self.calls.lock();
            if let Some(flight) = calls.get(key) {
                flight.callers.fetch_add(1, Ordering::SeqCst);
                (flight.rx.clone(), flight.callers.clone(), false)
            } else {
                let (tx, rx) = watch::channel(None);
                let callers = Arc::new(AtomicUsize::new(1));
                calls.insert(
                    key.to_string(),
                    Flight {
                        rx: rx.clone(),
                        callers: callers.clone(),
                    },
                );

                let table = self.calls.clone();
                let owned_key = key.to_string();
                tokio::spawn(async move {
                    let value = fut.await;
                    table.lock().remove(&owned_key);
                    let _ = tx.send(Some(value));
                });

                (rx, callers, true)
            }
        };

        let value = Self::wait(&mut rx).await;
        let shared = if leader {
            callers.load(Ordering::SeqCst) > 1
        } else {
            true
        };
        (value, shared)
    }

    /// Waits until the flight broadcasts its result.
    async fn wait(rx: &mut watch::Receiver<Option<T>>) -> T {
        loop {
            if let Some(value) = rx.borrow_and_update().clone() {
                return value;
            }
            if rx.changed().await.is_err() {
                // The sender only drops after sending unless the flight body
                // panicked, which is a programming error in the loader.
                if let Some(value) = rx.borrow().clone() {
                    return value;
                }
                panic!("single-flight leader dropped without a result");
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_caller_not_shared() {
        let flight: SingleFlight<String> = SingleFlight::new();
        let (value, shared) = flight.run("key", async { "bar".to_string() }).await;

        assert_eq!(value, "bar");
        assert!(!shared);
    }

    #[tokio::test]
    async fn test_sequential_flights_rerun() {
        let flight: Arc<SingleFlight<u64>> = Arc::new(SingleFlight::new());
        let counter = Arc::new(AtomicU64::new(0));

        for expected in 1..=3 {
            let c = counter.clone();
            let (value, _) = flight
                .run("key", async move { c.fetch_add(1, Ordering::SeqCst) + 1 })
                .await;
            assert_eq!(value, expected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_invocation() {
        let flight: Arc<SingleFlight<String>> = Arc::new(SingleFlight::new());
        let invocations = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let flight = flight.clone();
            let invocations = invocations.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run("key", async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        "payload".to_string()
                    })
                    .await
            }));
        }

        let mut saw_shared = false;
        for handle in handles {
            let (value, shared) = handle.await.unwrap();
            assert_eq!(value, "payload");
            saw_shared = saw_shared || shared;
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(saw_shared);
    }

    #[tokio::test]
    async fn test_errors_are_shared_too() {
        let flight: SingleFlight<Result<String, String>> = SingleFlight::new();
        let (value, _) = flight.run("key", async { Err("boom".to_string()) }).await;
        assert_eq!(value, Err("boom".to_string()));
    }
}
