//! The deduplicating, retrying fetch-and-cache layer in front of GitHub.
//!
//! Webhook handlers never trust the delivered payload; they re-fetch every
//! resource they act on. Within one delivery that leads to the same URLs
//! being requested over and over (the PR, its issue, its labels), so fetches
//! are cached per `(scope, url)` and coalesced: concurrent callers for the
//! same key serialize on a per-key lock and all observe the single upstream
//! fetch performed by whoever got there first.
//!
//! Entries expire by TTL measured from last write. Scope tokens are never
//! reused across units of work, so entries belonging to finished deliveries
//! simply age out; there is no manual invalidation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::retry::{Attempt, RetryPolicy};

/// An opaque token identifying one logical unit of work.
///
/// One webhook delivery or one sweep run gets exactly one `ScopeId`, and it
/// is never reused for unrelated work. It partitions the item cache so that
/// deduplication only happens *within* a unit of work, never across two.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(Arc<str>);

impl ScopeId {
    /// Creates a scope from an externally supplied token, such as the
    /// `X-GitHub-Delivery` id.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().into())
    }

    /// Creates a fresh random scope, used for sweep runs which have no
    /// delivery id of their own.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The key items and locks are stored under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    scope: ScopeId,
    url: String,
}

/// A scope-partitioned cache of fetched GitHub resources.
///
/// This is the only path through which handlers reach upstream resources.
/// It must not be re-entered for the same `(scope, url)` from within its own
/// critical section, as that would deadlock on the per-key lock; dependent
/// resources (PR → issue → labels) are fetched sequentially, each through
/// its own call.
#[derive(Debug)]
pub struct ItemCache {
    entries: moka::sync::Cache<CacheKey, Arc<Value>>,
    locks: moka::sync::Cache<CacheKey, Arc<Mutex<()>>>,
    retry: RetryPolicy,
    lock_wait_timeout: Option<std::time::Duration>,
}

impl ItemCache {
    pub fn new(config: &CacheConfig, retry: RetryPolicy) -> Self {
        let entries = moka::sync::Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .build();
        let locks = moka::sync::Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .build();

        Self {
            entries,
            locks,
            retry,
            lock_wait_timeout: config.lock_wait_timeout,
        }
    }

    /// Fetches `url` within `scope`, deduplicated and retried.
    ///
    /// Returns the cached value if one exists for this `(scope, url)`,
    /// otherwise runs `fetcher` under the retry policy and caches the result.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        scope: &ScopeId,
        url: &str,
        fetcher: F,
    ) -> Result<Arc<Value>>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.fetch_inner(scope, url, fetcher, None).await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), but only accepts values
    /// satisfying `success_condition`.
    ///
    /// A cached value failing the condition is refetched. A freshly fetched
    /// value failing the condition counts as a retryable failure: "fetched
    /// fine but semantically not ready yet" (e.g. GitHub still computing a
    /// PR's mergeability) is treated exactly like a transport error.
    pub async fn get_or_fetch_when<F, Fut, P>(
        &self,
        scope: &ScopeId,
        url: &str,
        fetcher: F,
        success_condition: P,
    ) -> Result<Arc<Value>>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
        P: Fn(&Value) -> bool + Sync,
    {
        self.fetch_inner(scope, url, fetcher, Some(&success_condition))
            .await
    }

    async fn fetch_inner<F, Fut>(
        &self,
        scope: &ScopeId,
        url: &str,
        fetcher: F,
        success_condition: Option<&(dyn Fn(&Value) -> bool + Sync)>,
    ) -> Result<Arc<Value>>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let key = CacheKey {
            scope: scope.clone(),
            url: url.to_owned(),
        };

        // `get_with` is an atomic insert-if-absent, so two concurrent callers
        // always end up with the same lock even under real parallelism.
        let lock = self
            .locks
            .get_with(key.clone(), || Arc::new(Mutex::new(())));

        let _guard = match self.lock_wait_timeout {
            None => lock.lock().await,
            Some(timeout) => tokio::time::timeout(timeout, lock.lock())
                .await
                .map_err(|_| Error::LockWaitTimeout)?,
        };

        // Inside the critical section: a cached value that the caller deems
        // acceptable is returned without touching the network at all.
        if let Some(cached) = self.entries.get(&key) {
            if success_condition.is_none_or(|accepts| accepts(&cached)) {
                return Ok(cached);
            }
        }

        let value = self
            .retry
            .run(|_| {
                let fut = fetcher(key.url.clone());
                async move {
                    match fut.await {
                        Ok(value) => {
                            if success_condition.is_some_and(|accepts| !accepts(&value)) {
                                Attempt::Retry(Error::NotReady)
                            } else {
                                Attempt::Done(Arc::new(value))
                            }
                        }
                        Err(err) => Attempt::Retry(err),
                    }
                }
            })
            .await?;

        // Only reached on success: a failed fetch sequence leaves any prior
        // (stale) entry in place, on purpose. A later caller without a
        // success condition may still observe the old value.
        self.entries.insert(key, value.clone());

        Ok(value)
    }
}
