//! Single-flight keyed cache
//!
//! Each key holds either a resolved value with its fetch time or the one fetch currently
//! running for it. Concurrent callers on a missing or stale key share that fetch. A failed
//! fetch clears the key, so the next caller starts a new one instead of replaying the error.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adapter_service::AdapterError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;

/// Outcome shared between every caller waiting on one fetch
pub type SharedResult<V> = std::result::Result<V, Arc<AdapterError>>;

type Flight<V> = Shared<BoxFuture<'static, SharedResult<V>>>;

enum Slot<V> {
    Ready { value: V, fetched_at: Instant },
    InFlight { flight: Flight<V>, generation: u64 },
}

pub struct FlightCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    /// `None` keeps resolved values forever
    freshness: Option<Duration>,
    generations: AtomicU64,
}

impl<K, V> FlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    /// Values older than `freshness` are refetched on next access
    pub fn with_freshness(freshness: Duration) -> Self {
        Self::new(Some(freshness))
    }

    /// Values are kept until invalidated
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    fn new(freshness: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            freshness,
            generations: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, joining or starting a fetch when needed
    ///
    /// `fetch` is only invoked when no fresh value and no running fetch exist.
    pub async fn get_or_fetch<F, Fut>(&self, key: &K, fetch: F) -> SharedResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, AdapterError>> + Send + 'static,
    {
        let (flight, generation) = {
            let mut slots = self.slots.lock();
            match slots.get(key) {
                Some(Slot::Ready { value, fetched_at }) if self.is_fresh(*fetched_at) => {
                    return Ok(value.clone());
                }
                Some(Slot::InFlight { flight, generation }) => (flight.clone(), *generation),
                _ => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    let flight = fetch().map(|result| result.map_err(Arc::new)).boxed().shared();
                    slots.insert(
                        key.clone(),
                        Slot::InFlight {
                            flight: flight.clone(),
                            generation,
                        },
                    );
                    (flight, generation)
                }
            }
        };

        let result = flight.await;
        self.settle(key, generation, &result);
        result
    }

    /// Cached value if present and fresh, without fetching
    pub fn peek(&self, key: &K) -> Option<V> {
        match self.slots.lock().get(key) {
            Some(Slot::Ready { value, fetched_at }) if self.is_fresh(*fetched_at) => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn invalidate(&self, key: &K) {
        self.slots.lock().remove(key);
    }

    /// Store the outcome of fetch `generation` unless a newer fetch owns the slot
    fn settle(&self, key: &K, generation: u64, result: &SharedResult<V>) {
        let mut slots = self.slots.lock();
        let owns_slot = matches!(
            slots.get(key),
            Some(Slot::InFlight { generation: current, .. }) if *current == generation
        );
        if !owns_slot {
            return;
        }

        match result {
            Ok(value) => {
                slots.insert(
                    key.clone(),
                    Slot::Ready {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
            Err(_) => {
                slots.remove(key);
            }
        }
    }

    fn is_fresh(&self, fetched_at: Instant) -> bool {
        match self.freshness {
            Some(window) => fetched_at.elapsed() <= window,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u64,
    ) -> impl Future<Output = std::result::Result<u64, AdapterError>> + Send + 'static {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(value)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = FlightCache::<&str, u64>::with_freshness(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch(&"eth", || counting_fetch(&calls, 1)),
            cache.get_or_fetch(&"eth", || counting_fetch(&calls, 2)),
            cache.get_or_fetch(&"eth", || counting_fetch(&calls, 3)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (1, 1, 1));
        assert_eq!(cache.peek(&"eth"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_clears_slot_for_next_caller() {
        let cache = FlightCache::<&str, u64>::with_freshness(Duration::from_secs(60));

        let (first, second) = tokio::join!(
            cache.get_or_fetch(&"eth", || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(AdapterError::Configuration("down".to_string()))
            }),
            cache.get_or_fetch(&"eth", || async { Ok(7) }),
        );
        assert!(first.is_err());
        assert!(second.is_err(), "joined the failing fetch");
        assert_eq!(cache.peek(&"eth"), None);

        let retried = cache.get_or_fetch(&"eth", || async { Ok(7) }).await;
        assert_eq!(retried.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_freshness_window() {
        let cache = FlightCache::<&str, u64>::with_freshness(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch(&"eth", || counting_fetch(&calls, 1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            cache.get_or_fetch(&"eth", || counting_fetch(&calls, 2)).await.unwrap(),
            1
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            cache.get_or_fetch(&"eth", || counting_fetch(&calls, 2)).await.unwrap(),
            2
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unbounded_keys_are_independent() {
        let cache = FlightCache::<String, String>::unbounded();
        let a = cache
            .get_or_fetch(&"a".to_string(), || async { Ok("url-a".to_string()) })
            .await;
        let b = cache
            .get_or_fetch(&"b".to_string(), || async { Ok("url-b".to_string()) })
            .await;
        assert_eq!(a.unwrap(), "url-a");
        assert_eq!(b.unwrap(), "url-b");

        cache.invalidate(&"a".to_string());
        assert_eq!(cache.peek(&"a".to_string()), None);
        assert_eq!(cache.peek(&"b".to_string()), Some("url-b".to_string()));
    }
}
