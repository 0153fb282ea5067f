//! Result cache with stale-while-revalidate reads.
//!
//! Two kinds of key: [`CacheKey::Services`] holds the whole result set,
//! [`CacheKey::Service`] one service's record.  Reads never block on a
//! refresh once a value exists:
//!
//! - fresh value: returned as-is;
//! - stale value: returned immediately, refresh started in the background;
//! - no value: the caller waits for the first load.
//!
//! # Concurrent refreshes
//!
//! Fetches are de-duplicated per key: every reader joins the same shared
//! future.  A forced [`StatusCache::refresh`] always starts a new pass.
//! Each pass is tagged with a generation number when it starts, and a
//! completed pass older than the stored value is dropped, so a slow pass
//! can never overwrite a newer one.
//!
//! # Eviction
//!
//! [`StatusCache::gc`] drops keys not used for longer than their horizon;
//! every read runs it first.  Reads, forced refreshes and accepted writes
//! all count as a use.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use tracing::debug;

use crate::config::CacheConfig;
use crate::fanout::FanOut;
use crate::registry::Registry;
use crate::status::NormalizedStatus;

// ── Keys and read shape ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The full result set.
    Services,
    /// One service, by registry name.
    Service(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Services => f.write_str("services-data"),
            CacheKey::Service(name) => write!(f, "service-data/{name}"),
        }
    }
}

/// What a reader sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState<T> {
    pub data: Option<T>,
    /// No data yet and a first load is running.
    pub is_loading: bool,
    /// Any fetch for this key is running.
    pub is_fetching: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    fn new(data: Option<T>, is_fetching: bool, fetched_at: Option<DateTime<Utc>>) -> Self {
        Self { is_loading: data.is_none() && is_fetching, data, is_fetching, fetched_at }
    }
}

// ── Slots ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum CachedValue {
    Services(Arc<[NormalizedStatus]>),
    Service(NormalizedStatus),
}

struct Stored {
    value: CachedValue,
    fetched_at: DateTime<Utc>,
    generation: u64,
}

type Pending = Shared<BoxFuture<'static, ()>>;

struct Slot {
    stored: Option<Stored>,
    last_access: DateTime<Utc>,
    in_flight: Option<(u64, Pending)>,
}

impl Slot {
    fn new(now: DateTime<Utc>) -> Self {
        Self { stored: None, last_access: now, in_flight: None }
    }
}

enum Action {
    Serve,
    Revalidate,
    Load,
}

/// Age of `then` at `now`; `None` if `then` is in the future.
fn age(now: DateTime<Utc>, then: DateTime<Utc>) -> Option<Duration> {
    (now - then).to_std().ok()
}

// ── Cache ─────────────────────────────────────────────────────────────────────

struct Inner {
    fanout: FanOut,
    registry: Registry,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    generation: AtomicU64,
}

/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct StatusCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusCache")
            .field("entries", &self.entry_count())
            .field("clock", &self.inner.clock)
            .finish()
    }
}

impl StatusCache {
    pub fn new(fanout: FanOut, registry: Registry, config: CacheConfig) -> Self {
        Self::with_clock(fanout, registry, config, Arc::new(SystemClock))
    }

    pub fn with_clock(fanout: FanOut, registry: Registry, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fanout,
                registry,
                config,
                clock,
                slots: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Number of keys currently held.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Full result set, stale-while-revalidate.
    pub async fn get_all(&self) -> QueryState<Vec<NormalizedStatus>> {
        self.gc();
        self.read_through(&CacheKey::Services).await;
        self.services_state()
    }

    /// One service; `None` when `name` is not in the registry.
    ///
    /// A fresh full result set is sliced first; only when it has nothing
    /// newer does this fall back to dispatching the single entry.
    pub async fn get_service(&self, name: &str) -> Option<QueryState<NormalizedStatus>> {
        self.inner.registry.find(name)?;
        self.gc();
        if let Some(state) = self.slice_full_set(name) {
            return Some(state);
        }
        let key = CacheKey::Service(name.to_string());
        self.read_through(&key).await;
        Some(self.service_state(&key))
    }

    /// Forced full pass, bypassing staleness and any pass already running.
    pub async fn refresh(&self) -> QueryState<Vec<NormalizedStatus>> {
        self.inner.pending(&CacheKey::Services, true).await;
        self.services_state()
    }

    /// Current full-set state without triggering any fetch.
    pub fn services_state(&self) -> QueryState<Vec<NormalizedStatus>> {
        let slots = self.inner.lock();
        match slots.get(&CacheKey::Services) {
            Some(slot) => {
                let (data, fetched_at) = match &slot.stored {
                    Some(Stored { value: CachedValue::Services(all), fetched_at, .. }) => {
                        (Some(all.to_vec()), Some(*fetched_at))
                    }
                    _ => (None, None),
                };
                QueryState::new(data, slot.in_flight.is_some(), fetched_at)
            }
            None => QueryState::new(None, false, None),
        }
    }

    /// Evict keys idle past their horizon.  Keys with a fetch running are
    /// kept.  Returns how many were dropped.
    pub fn gc(&self) -> usize {
        let now = self.inner.clock.now();
        let mut slots = self.inner.lock();
        let before = slots.len();
        slots.retain(|key, slot| {
            if slot.in_flight.is_some() {
                return true;
            }
            match self.inner.gc_horizon(key) {
                Some(horizon) => age(now, slot.last_access).is_none_or(|idle| idle < horizon),
                None => true,
            }
        });
        let evicted = before - slots.len();
        if evicted > 0 {
            debug!(evicted, remaining = slots.len(), "cache gc");
        }
        evicted
    }

    async fn read_through(&self, key: &CacheKey) {
        let action = {
            let now = self.inner.clock.now();
            let mut slots = self.inner.lock();
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(now));
            slot.last_access = now;
            match &slot.stored {
                Some(stored) if !self.inner.is_stale(key, stored.fetched_at, now) => Action::Serve,
                Some(_) => Action::Revalidate,
                None => Action::Load,
            }
        };

        match action {
            Action::Serve => {}
            Action::Revalidate => {
                debug!(key = %key, "stale, revalidating in background");
                tokio::spawn(self.inner.pending(key, false));
            }
            Action::Load => self.inner.pending(key, false).await,
        }
    }

    fn slice_full_set(&self, name: &str) -> Option<QueryState<NormalizedStatus>> {
        let now = self.inner.clock.now();
        let mut slots = self.inner.lock();

        let single_fetched = slots
            .get(&CacheKey::Service(name.to_string()))
            .and_then(|s| s.stored.as_ref())
            .map(|s| s.fetched_at);

        let full = slots.get_mut(&CacheKey::Services)?;
        let stored = full.stored.as_ref()?;
        if self.inner.is_stale(&CacheKey::Services, stored.fetched_at, now) {
            return None;
        }
        if single_fetched.is_some_and(|t| t > stored.fetched_at) {
            return None;
        }
        let CachedValue::Services(all) = &stored.value else {
            return None;
        };
        let record = all.iter().find(|s| s.name == name)?.clone();
        let fetched_at = stored.fetched_at;
        full.last_access = now;
        Some(QueryState::new(Some(record), full.in_flight.is_some(), Some(fetched_at)))
    }

    fn service_state(&self, key: &CacheKey) -> QueryState<NormalizedStatus> {
        let slots = self.inner.lock();
        match slots.get(key) {
            Some(slot) => {
                let (data, fetched_at) = match &slot.stored {
                    Some(Stored { value: CachedValue::Service(one), fetched_at, .. }) => {
                        (Some(one.clone()), Some(*fetched_at))
                    }
                    _ => (None, None),
                };
                QueryState::new(data, slot.in_flight.is_some(), fetched_at)
            }
            None => QueryState::new(None, false, None),
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stale_after(&self, key: &CacheKey) -> Duration {
        match key {
            CacheKey::Services => self.config.services_stale,
            CacheKey::Service(_) => self.config.service_stale,
        }
    }

    fn gc_horizon(&self, key: &CacheKey) -> Option<Duration> {
        match key {
            CacheKey::Services => Some(self.config.services_gc),
            CacheKey::Service(_) => self.config.service_gc,
        }
    }

    fn is_stale(&self, key: &CacheKey, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        age(now, fetched_at).is_some_and(|a| a >= self.stale_after(key))
    }

    /// Join the running fetch for `key`, or start one.  `force` always
    /// starts a new one.
    fn pending(self: &Arc<Self>, key: &CacheKey, force: bool) -> Pending {
        let now = self.clock.now();
        let mut slots = self.lock();
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(now));
        if !force {
            if let Some((_, running)) = &slot.in_flight {
                return running.clone();
            }
        }
        // Starting a pass counts as a use of the key.
        slot.last_access = now;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(self);
        let owned_key = key.clone();
        let fut = async move {
            let value = inner.compute(&owned_key).await;
            inner.store(&owned_key, generation, value);
        }
        .boxed()
        .shared();

        debug!(key = %key, generation, force, "fetch started");
        slot.in_flight = Some((generation, fut.clone()));
        fut
    }

    async fn compute(&self, key: &CacheKey) -> Option<CachedValue> {
        match key {
            CacheKey::Services => {
                let all = self.fanout.fetch_all(self.registry.entries()).await;
                Some(CachedValue::Services(all.into()))
            }
            CacheKey::Service(name) => self
                .fanout
                .fetch_one(&self.registry, name)
                .await
                .map(CachedValue::Service),
        }
    }

    fn store(&self, key: &CacheKey, generation: u64, value: Option<CachedValue>) {
        let now = self.clock.now();
        let mut slots = self.lock();
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(now));
        if slot.in_flight.as_ref().is_some_and(|(g, _)| *g == generation) {
            slot.in_flight = None;
        }
        let Some(value) = value else {
            return;
        };
        match &slot.stored {
            Some(current) if current.generation > generation => {
                debug!(
                    key = %key,
                    generation,
                    current = current.generation,
                    "discarding superseded result"
                );
            }
            _ => {
                slot.stored = Some(Stored { value, fetched_at: now, generation });
                slot.last_access = now;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatch::Dispatcher;
    use crate::fetch::Fetcher;
    use crate::registry::RegistryEntry;
    use crate::status::fallback;

    fn registry() -> Registry {
        Registry::new(vec![
            RegistryEntry::new("Beta", "https://status.beta.com", "Dev", Some("custom")),
            RegistryEntry::new("alpha", "https://status.alpha.com", "Dev", Some("azure")),
        ])
    }

    fn cache() -> (StatusCache, Arc<ManualClock>) {
        let config = Config::test_default();
        let fanout = FanOut::new(Dispatcher::new(Fetcher::new(&config.fetch).unwrap()), 5);
        let clock = Arc::new(ManualClock::default());
        let cache = StatusCache::with_clock(fanout, registry(), config.cache, clock.clone());
        (cache, clock)
    }

    async fn settle(cache: &StatusCache) {
        for _ in 0..100 {
            if !cache.services_state().is_fetching {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn key_labels() {
        assert_eq!(CacheKey::Services.to_string(), "services-data");
        assert_eq!(CacheKey::Service("Acme".into()).to_string(), "service-data/Acme");
    }

    #[test]
    fn empty_state_is_idle() {
        let (cache, _) = cache();
        let state = cache.services_state();
        assert!(state.data.is_none());
        assert!(!state.is_loading);
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn first_read_loads_then_serves_fresh() {
        let (cache, clock) = cache();
        let first = cache.get_all().await;
        let data = first.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].name, "alpha");
        assert!(!first.is_loading);

        clock.advance(Duration::from_secs(60));
        let second = cache.get_all().await;
        assert_eq!(second.fetched_at, first.fetched_at);
        assert!(!second.is_fetching);
    }

    #[tokio::test]
    async fn stale_read_returns_old_value_and_revalidates() {
        let (cache, clock) = cache();
        let first = cache.get_all().await;

        clock.advance(Duration::from_secs(121));
        let stale = cache.get_all().await;
        assert_eq!(stale.fetched_at, first.fetched_at);
        assert!(stale.data.is_some());
        assert!(stale.is_fetching);

        settle(&cache).await;
        let after = cache.services_state();
        assert!(after.fetched_at > first.fetched_at);
    }

    #[tokio::test]
    async fn refresh_bypasses_staleness() {
        let (cache, clock) = cache();
        let first = cache.get_all().await;
        clock.advance(Duration::from_secs(1));
        let refreshed = cache.refresh().await;
        assert!(refreshed.fetched_at > first.fetched_at);
    }

    #[tokio::test]
    async fn gc_evicts_idle_full_set() {
        let (cache, clock) = cache();
        cache.get_all().await;
        assert_eq!(cache.gc(), 0);
        clock.advance(Duration::from_secs(301));
        assert_eq!(cache.gc(), 1);
        assert!(cache.services_state().data.is_none());
    }

    #[tokio::test]
    async fn single_service_slices_full_set() {
        let (cache, _) = cache();
        let all = cache.get_all().await;
        let one = cache.get_service("Beta").await.unwrap();
        assert_eq!(one.fetched_at, all.fetched_at);
        assert_eq!(one.data.unwrap().name, "Beta");
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn single_service_without_full_set_dispatches() {
        let (cache, clock) = cache();
        let one = cache.get_service("alpha").await.unwrap();
        assert_eq!(one.data.unwrap().name, "alpha");
        clock.advance(Duration::from_secs(10_000));
        assert_eq!(cache.gc(), 0);
    }

    #[tokio::test]
    async fn unknown_service_is_none() {
        let (cache, _) = cache();
        assert!(cache.get_service("Gamma").await.is_none());
    }

    #[test]
    fn older_generation_never_overwrites_newer() {
        let (cache, _) = cache();
        let entry = RegistryEntry::new("Beta", "https://status.beta.com", "Dev", Some("custom"));
        let newer = CachedValue::Services(vec![fallback::external_status(&entry)].into());
        let older = CachedValue::Services(vec![fallback::error_status(&entry)].into());

        cache.inner.store(&CacheKey::Services, 2, Some(newer));
        cache.inner.store(&CacheKey::Services, 1, Some(older));

        let data = cache.services_state().data.unwrap();
        assert_eq!(data[0].indicator(), crate::status::Indicator::External);
    }
}
