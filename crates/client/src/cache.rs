//! Keyed response cache with request coalescing.
//!
//! Successful GET responses are cached by [`RequestKey`], so repeated requests
//! for the same resource resolve without touching the network. Concurrent
//! requests for one key collapse onto a single in-flight fetch: the first
//! caller becomes the leader and executes the request, later callers subscribe
//! to its broadcast and share the result. Errors are never cached.
//!
//! Revalidation is opt-in and off by default. A [`RevalidationPolicy`] decides
//! whether focus or reconnect notifications, or entry age, mark cached entries
//! for refetch; with the default policy a cached entry is served indefinitely
//! until it is invalidated.

use crate::fetch::{FetchClient, FetchError, FetchResponse, RequestDescriptor, RequestKey};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Fetch outcome shared between the leader and its followers.
///
/// Errors are wrapped in [`Arc`] so one failure can be handed to every waiting
/// caller without cloning the underlying error.
pub type SharedFetchResult = std::result::Result<FetchResponse, Arc<FetchError>>;

/// Controls when cached entries are refetched instead of served.
///
/// The default policy disables every trigger: focus and reconnect
/// notifications are ignored and entries never go stale.
#[derive(Debug, Clone)]
pub struct RevalidationPolicy {
    revalidate_if_stale: bool,
    revalidate_on_focus: bool,
    revalidate_on_reconnect: bool,
    stale_after: chrono::Duration,
}

impl Default for RevalidationPolicy {
    fn default() -> Self {
        Self {
            revalidate_if_stale: false,
            revalidate_on_focus: false,
            revalidate_on_reconnect: false,
            stale_after: chrono::Duration::minutes(5),
        }
    }
}

impl RevalidationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refetch entries older than [`stale_after`](Self::with_stale_after).
    pub fn with_revalidate_if_stale(mut self, enabled: bool) -> Self {
        self.revalidate_if_stale = enabled;
        self
    }

    /// Refetch cached entries after a focus notification.
    pub fn with_revalidate_on_focus(mut self, enabled: bool) -> Self {
        self.revalidate_on_focus = enabled;
        self
    }

    /// Refetch cached entries after a reconnect notification.
    pub fn with_revalidate_on_reconnect(mut self, enabled: bool) -> Self {
        self.revalidate_on_reconnect = enabled;
        self
    }

    /// Age at which an entry counts as stale. Only consulted when
    /// [`with_revalidate_if_stale`](Self::with_revalidate_if_stale) is on.
    pub fn with_stale_after(mut self, stale_after: chrono::Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn revalidate_if_stale(&self) -> bool {
        self.revalidate_if_stale
    }

    pub fn revalidate_on_focus(&self) -> bool {
        self.revalidate_on_focus
    }

    pub fn revalidate_on_reconnect(&self) -> bool {
        self.revalidate_on_reconnect
    }

    pub fn stale_after(&self) -> chrono::Duration {
        self.stale_after
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: FetchResponse,
    fetched_at: DateTime<Utc>,
    revalidate_requested: bool,
}

impl CacheEntry {
    fn fresh(response: FetchResponse) -> Self {
        Self {
            response,
            fetched_at: Utc::now(),
            revalidate_requested: false,
        }
    }

    fn needs_revalidation(&self, policy: &RevalidationPolicy, now: DateTime<Utc>) -> bool {
        if self.revalidate_requested {
            return true;
        }
        policy.revalidate_if_stale && now - self.fetched_at > policy.stale_after
    }
}

/// Result of trying to acquire the in-flight slot for a key.
enum FlightSlot {
    /// We won the race and should execute the request.
    Leader(broadcast::Sender<SharedFetchResult>),
    /// Another task is executing; wait for its result.
    Follower(broadcast::Receiver<SharedFetchResult>),
}

/// Shared response cache keyed by relative request URL.
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<RequestKey, CacheEntry>,
    in_flight: DashMap<RequestKey, broadcast::Sender<SharedFetchResult>>,
    policy: RevalidationPolicy,
}

impl ResponseCache {
    pub fn new(policy: RevalidationPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &RevalidationPolicy {
        &self.policy
    }

    /// Resolves `request` through the cache.
    ///
    /// Serves the cached response when one exists and the policy does not
    /// require revalidation. Otherwise issues at most one network request per
    /// key, no matter how many callers arrive concurrently. Successful
    /// responses replace the cached entry; failures leave it untouched.
    pub async fn fetch(
        &self,
        client: &dyn FetchClient,
        request: &RequestDescriptor,
    ) -> SharedFetchResult {
        let key = request.key();
        loop {
            if let Some(entry) = self.entries.get(&key) {
                if !entry.needs_revalidation(&self.policy, Utc::now()) {
                    return Ok(entry.response.clone());
                }
            }

            match self.acquire(key.clone()) {
                FlightSlot::Leader(tx) => {
                    let guard = FlightGuard::new(self, key.clone());
                    let result = client.get(request).await.map_err(Arc::new);
                    if let Ok(response) = &result {
                        self.entries
                            .insert(key.clone(), CacheEntry::fresh(response.clone()));
                    }
                    // The entry insert happens before the slot is released, so
                    // a caller that misses the broadcast finds the cache
                    // populated instead.
                    guard.complete();
                    let _ = tx.send(result.clone());
                    return result;
                }
                FlightSlot::Follower(mut rx) => match rx.recv().await {
                    Ok(result) => return result,
                    // The leader went away without publishing; race again.
                    Err(_) => continue,
                },
            }
        }
    }

    /// Atomically joins or creates the in-flight slot for `key`.
    fn acquire(&self, key: RequestKey) -> FlightSlot {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => FlightSlot::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                FlightSlot::Leader(tx)
            }
        }
    }

    fn release(&self, key: &RequestKey) {
        self.in_flight.remove(key);
    }

    /// Marks every cached entry for refetch after a window-focus event.
    ///
    /// Ignored unless the policy enables focus revalidation.
    pub fn notify_focus(&self) {
        if self.policy.revalidate_on_focus {
            self.request_revalidation();
        }
    }

    /// Marks every cached entry for refetch after connectivity returns.
    ///
    /// Ignored unless the policy enables reconnect revalidation.
    pub fn notify_reconnect(&self) {
        if self.policy.revalidate_on_reconnect {
            self.request_revalidation();
        }
    }

    fn request_revalidation(&self) {
        for mut entry in self.entries.iter_mut() {
            entry.revalidate_requested = true;
        }
    }

    /// Drops the cached entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &RequestKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// RAII guard releasing the in-flight slot even if the leader panics.
struct FlightGuard<'a> {
    cache: &'a ResponseCache,
    key: RequestKey,
    completed: bool,
}

impl<'a> FlightGuard<'a> {
    fn new(cache: &'a ResponseCache, key: RequestKey) -> Self {
        Self {
            cache,
            key,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.cache.release(&self.key);
        self.completed = true;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.cache.release(&self.key);
        }
    }
}
