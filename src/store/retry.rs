use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{KvStore, StoreError, WriteBatch};

/// Retry policy for transient store failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Wraps a store and retries operations that fail with a transient error.
/// Batches are atomic, so replaying a failed commit is safe.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: KvStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn pause(&self, attempt: u32, err: &StoreError) {
        let wait = self.policy.backoff(attempt);
        log::warn!(
            "Transient store failure (attempt {}/{}): {}, retrying in {:?}",
            attempt,
            self.policy.max_attempts,
            err,
            wait
        );
        tokio::time::sleep(wait).await;
    }
}

#[async_trait]
impl<S: KvStore> KvStore for RetryingStore<S> {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let mut attempt = 1;
        loop {
            match self.inner.get(namespace, key).await {
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    self.pause(attempt, &e).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut attempt = 1;
        loop {
            match self.inner.commit(batch.clone()).await {
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    self.pause(attempt, &e).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` commits with the given error kind.
    struct Flaky {
        inner: MemoryStore,
        failures: AtomicU32,
        transient: bool,
        calls: AtomicU32,
    }

    #[async_trait]
    impl KvStore for Flaky {
        async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(namespace, key).await
        }

        async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(if self.transient {
                    StoreError::Unavailable("connection reset".into())
                } else {
                    StoreError::Db(sqlx::Error::RowNotFound)
                });
            }
            self.inner.commit(batch).await
        }
    }

    fn flaky(failures: u32, transient: bool) -> Flaky {
        Flaky {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(failures),
            transient,
            calls: AtomicU32::new(0),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = RetryingStore::new(flaky(2, true), fast_policy());
        store.put("ns", "k", json!("v")).await.unwrap();
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.get("ns", "k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let store = RetryingStore::new(flaky(5, true), fast_policy());
        let err = store.put("ns", "k", json!("v")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let store = RetryingStore::new(flaky(1, false), fast_policy());
        assert!(store.put("ns", "k", json!("v")).await.is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }
}
