// ── Request coalescing ──
//
// At most one remote read per key is in flight. Callers arriving while a
// read is running await the same shared future and receive a clone of its
// outcome, success or failure. The key is released when the read settles,
// so the next caller starts a fresh read.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::trace;

type InFlight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Single-flight map from key to the pending read for that key.
pub struct RequestCoalescer<K, T, E>
where
    K: Eq + Hash,
{
    in_flight: Arc<DashMap<K, InFlight<T, E>>>,
}

impl<K, T, E> RequestCoalescer<K, T, E>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Run `producer` for `key` unless a read for `key` is already pending,
    /// in which case join it. `producer` is only invoked by the first caller.
    pub async fn run<F, Fut>(&self, key: K, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(pending) => {
                trace!(?key, "joining in-flight read");
                pending.get().clone()
            }
            Entry::Vacant(slot) => {
                let registry = Arc::clone(&self.in_flight);
                let read = producer();
                let shared = async move {
                    let result = read.await;
                    registry.remove(&key);
                    result
                }
                .boxed()
                .shared();
                slot.insert(shared.clone());
                shared
            }
        };
        shared.await
    }

    /// Number of keys with a read currently pending.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }
}

impl<K, T, E> Default for RequestCoalescer<K, T, E>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_read() {
        let coalescer: RequestCoalescer<String, bool, String> = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let read = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(true)
            }
        };

        let (a, b, c) = tokio::join!(
            coalescer.run("r1".to_owned(), read),
            coalescer.run("r1".to_owned(), read),
            coalescer.run("r1".to_owned(), read),
        );

        assert_eq!((a, b, c), (Ok(true), Ok(true), Ok(true)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_shared_then_released() {
        let coalescer: RequestCoalescer<String, bool, String> = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<bool, _>("timeout".to_owned())
            }
        };

        let (a, b) = tokio::join!(
            coalescer.run("r1".to_owned(), failing),
            coalescer.run("r1".to_owned(), failing),
        );
        assert_eq!(a, Err("timeout".to_owned()));
        assert_eq!(b, Err("timeout".to_owned()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Settled: the next caller starts a fresh read.
        let again = coalescer.run("r1".to_owned(), failing).await;
        assert!(again.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_run_independently() {
        let coalescer: RequestCoalescer<String, u32, String> = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = |value: u32| {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            }
        };

        let (a, b) = tokio::join!(
            coalescer.run("r1".to_owned(), counted(1)),
            coalescer.run("r2".to_owned(), counted(2)),
        );
        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
