//! Bucketed TTL Store
//!
//! This module implements the core store for ttlkv: a thread-safe map from
//! keys to values where every entry carries an expiration time, indexed by
//! coarse expiry buckets so that dead entries can be reclaimed in batches.
//!
//! ## Design Decisions
//!
//! 1. **One lock, two structures**: the entry map and the bucket index are
//!    always mutated together under a single mutex. An entry and its bucket
//!    membership are never observable in a half-updated state.
//! 2. **Lazy expiry**: a read that finds an entry past its expiry removes
//!    the entry and reports the key as absent, even if the background sweep
//!    has not run yet. The read is authoritative; the sweep is only for
//!    memory reclamation.
//! 3. **Recorded bucket ids**: each entry stores the bucket id computed from
//!    its own expiry time. Updates remove the old index membership by
//!    reading that recorded id back, never by recomputing it from another
//!    value.
//! 4. **Injected collaborators**: the store reads time from a [`Clock`] and
//!    arms its sweep through a [`Scheduler`], both supplied at construction.
//!
//! ## Data Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       TtlStore                             │
//! │  Mutex ┌──────────────────────┬───────────────────────┐    │
//! │        │ entries              │ buckets               │    │
//! │        │ K -> (V, expires_at, │ bucket_id -> {K, ...} │    │
//! │        │       bucket_id)     │                       │    │
//! │        └──────────────────────┴───────────────────────┘    │
//! └────────────────────────────────────────────────────────────┘
//!                              ▲
//!                              │ every `resolution`
//!                  ┌───────────┴────────────┐
//!                  │     sweep callback     │
//!                  │ (deferred, cancelable) │
//!                  └────────────────────────┘
//! ```

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::schedule::{Scheduler, TokioScheduler};
use crate::store::sweep::{self, SweepControl};
use crate::time::{Clock, MonotonicClock};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// A stored value with its expiry time and the bucket it is indexed under.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// When this entry expires, on the owning clock's timeline.
    expires_at: Duration,
    /// The bucket this entry is indexed under, computed from `expires_at`
    /// at the moment the entry was written.
    bucket: u64,
}

/// Returns the bucket a given expiry time falls into.
pub(crate) fn bucket_id(at: Duration, resolution: Duration) -> u64 {
    (at.as_nanos() / resolution.as_nanos()) as u64
}

/// The entry map and bucket index, mutated together under the store lock.
pub(crate) struct State<K, V> {
    entries: HashMap<K, Entry<V>>,
    buckets: HashMap<u64, HashSet<K>>,
}

impl<K, V> State<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            buckets: HashMap::new(),
        }
    }

    /// Writes an entry, replacing any previous one for the same key.
    ///
    /// The old index membership is removed using the bucket id recorded in
    /// the existing entry.
    fn insert(&mut self, key: K, value: V, expires_at: Duration, resolution: Duration) {
        let bucket = bucket_id(expires_at, resolution);

        if let Some(old) = self.entries.get(&key) {
            Self::unlink(&mut self.buckets, old.bucket, &key);
        }

        self.buckets.entry(bucket).or_default().insert(key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                bucket,
            },
        );
    }

    /// Drops a key from a bucket's set, removing the set once empty.
    fn unlink(buckets: &mut HashMap<u64, HashSet<K>>, bucket: u64, key: &K) {
        if let Some(set) = buckets.get_mut(&bucket) {
            set.remove(key);
            if set.is_empty() {
                buckets.remove(&bucket);
            }
        }
    }

    /// Reclaims every bucket strictly below `current_bucket`.
    ///
    /// Every key in such a bucket has `expires_at < current_bucket *
    /// resolution <= now`, so the whole bucket is dead. Keys whose entry is
    /// already gone, or whose entry has since been rewritten into a newer
    /// bucket, are stale references and are skipped.
    ///
    /// Returns the number of entries removed.
    pub(crate) fn sweep_before(&mut self, current_bucket: u64) -> u64 {
        let expired: Vec<u64> = self
            .buckets
            .keys()
            .copied()
            .filter(|bucket| *bucket < current_bucket)
            .collect();

        let mut removed = 0u64;
        for bucket in expired {
            if let Some(keys) = self.buckets.remove(&bucket) {
                for key in keys {
                    if let Some(entry) = self.entries.get(&key) {
                        if entry.bucket == bucket {
                            self.entries.remove(&key);
                            removed += 1;
                        }
                    }
                }
            }
        }
        removed
    }
}

/// State shared between the store handle and the pending sweep callback.
pub(crate) struct Shared<K, V> {
    pub(crate) state: Mutex<State<K, V>>,
    pub(crate) control: Mutex<SweepControl>,
    pub(crate) resolution: Duration,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) scheduler: Arc<dyn Scheduler>,

    pub(crate) get_count: AtomicU64,
    pub(crate) set_count: AtomicU64,
    pub(crate) expired_lazy: AtomicU64,
    pub(crate) expired_swept: AtomicU64,
    pub(crate) sweep_count: AtomicU64,
}

/// An in-memory key/value store where every entry expires.
///
/// Entries are indexed by coarse expiry buckets
/// (`bucket = floor(expires_at / resolution)`). A read that encounters an
/// expired entry discards it immediately; a periodic sweep reclaims whole
/// buckets that are guaranteed fully expired, so memory is bounded without
/// scanning the store on every access.
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// tasks or threads. All operations are thread-safe and run under a single
/// per-store lock; no global state is involved.
///
/// # Lifecycle
///
/// The store starts `Active` with its sweep armed. [`shutdown`] cancels the
/// pending sweep and is one-way: afterwards explicit operations remain
/// legal, but memory no longer self-reclaims. Dropping the store shuts it
/// down as well, so a pending callback never outlives it.
///
/// # Example
///
/// ```no_run
/// use ttlkv::TtlStore;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store: TtlStore<String, String> = TtlStore::new();
///
/// store
///     .setex("session".to_string(), Duration::from_secs(60), "abc123".to_string())
///     .unwrap();
///
/// assert_eq!(store.get(&"session".to_string()).unwrap(), "abc123");
/// # }
/// ```
///
/// [`shutdown`]: TtlStore::shutdown
pub struct TtlStore<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> std::fmt::Debug for TtlStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.shared.state.lock().unwrap().entries.len();
        f.debug_struct("TtlStore")
            .field("resolution", &self.shared.resolution)
            .field("keys", &keys)
            .finish()
    }
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Creates a store with the default configuration, the production
    /// monotonic clock, and the tokio-backed scheduler.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime context (the production
    /// scheduler needs one), or if the configured resolution is zero.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store with a custom configuration and the production
    /// clock and scheduler.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime context, or if
    /// `config.resolution` is zero.
    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(MonotonicClock::new()),
            Arc::new(TokioScheduler::new()),
        )
    }

    /// Creates a store with explicit clock and scheduler collaborators.
    ///
    /// This is the constructor tests use to drive the store through
    /// simulated time with [`ManualClock`](crate::ManualClock) and
    /// [`ManualScheduler`](crate::ManualScheduler).
    ///
    /// # Panics
    ///
    /// Panics if `config.resolution` is zero.
    pub fn with_parts(
        config: StoreConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        assert!(
            !config.resolution.is_zero(),
            "resolution must be greater than zero"
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(State::new()),
            control: Mutex::new(SweepControl::new()),
            resolution: config.resolution,
            clock,
            scheduler,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            expired_lazy: AtomicU64::new(0),
            expired_swept: AtomicU64::new(0),
            sweep_count: AtomicU64::new(0),
        });

        sweep::arm(&shared);
        info!(
            resolution_ms = config.resolution.as_millis() as u64,
            "ttl store started"
        );

        Self { shared }
    }

    /// Returns the value for a key.
    ///
    /// An entry past its expiry is invisible: it is removed from the store
    /// and reported as [`StoreError::KeyNotFound`], whether or not the
    /// sweep has run. Only the entry itself is removed here; its index
    /// membership is left for the sweep, which tolerates stale references.
    pub fn get(&self, key: &K) -> StoreResult<V> {
        self.shared.get_count.fetch_add(1, Ordering::Relaxed);

        let mut state = self.shared.state.lock().unwrap();
        let now = self.shared.clock.now();

        let entry = state.entries.get(key).ok_or(StoreError::KeyNotFound)?;
        if entry.expires_at < now {
            state.entries.remove(key);
            self.shared.expired_lazy.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::KeyNotFound);
        }
        Ok(entry.value.clone())
    }

    /// Stores a value that expires `ttl` from now.
    ///
    /// If the key already exists, its entry is replaced and its old bucket
    /// membership is dropped, so a key is only ever indexed under the
    /// bucket of its current expiry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTtl`] if `ttl` is zero.
    pub fn setex(&self, key: K, ttl: Duration, value: V) -> StoreResult<()> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl);
        }
        self.shared.set_count.fetch_add(1, Ordering::Relaxed);

        let mut state = self.shared.state.lock().unwrap();
        let now = self.shared.clock.now();
        state.insert(key, value, now + ttl, self.shared.resolution);
        Ok(())
    }

    /// Returns the remaining time to live for a key.
    ///
    /// `None` means the key is absent or already expired; this is the
    /// non-raising counterpart to [`get`](TtlStore::get) for the common
    /// "does this key still have time left" question. Never removes
    /// anything, even when it observes an expired entry.
    pub fn ttl(&self, key: &K) -> Option<Duration> {
        let state = self.shared.state.lock().unwrap();
        let now = self.shared.clock.now();

        state
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at.checked_sub(now))
    }

    /// Re-arms an existing key with a new TTL, keeping its current value.
    ///
    /// The read and the rewrite happen inside one critical section, so no
    /// concurrent operation can observe the key disappear in between.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTtl`] if `ttl` is zero, and
    /// [`StoreError::KeyNotFound`] if the key is absent or has expired.
    pub fn expire(&self, key: &K, ttl: Duration) -> StoreResult<()> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl);
        }

        let mut state = self.shared.state.lock().unwrap();
        let now = self.shared.clock.now();

        let entry = state.entries.get(key).ok_or(StoreError::KeyNotFound)?;
        if entry.expires_at < now {
            state.entries.remove(key);
            self.shared.expired_lazy.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::KeyNotFound);
        }

        let value = entry.value.clone();
        state.insert(key.clone(), value, now + ttl, self.shared.resolution);
        Ok(())
    }

    /// Deletes a key, if present. Absent keys are a no-op.
    ///
    /// The key's index membership is dropped along with the entry.
    pub fn remove(&self, key: &K) {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(entry) = state.entries.remove(key) {
            State::<K, V>::unlink(&mut state.buckets, entry.bucket, key);
        }
    }

    /// Returns the number of entries not yet reclaimed.
    ///
    /// Entries past their expiry that neither a read nor the sweep has
    /// discovered yet are still counted.
    pub fn len(&self) -> usize {
        self.shared.state.lock().unwrap().entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry and every bucket.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.entries.clear();
        state.buckets.clear();
    }

    /// Returns operation and expiry counters.
    pub fn stats(&self) -> TtlStoreStats {
        TtlStoreStats {
            keys: self.len() as u64,
            gets: self.shared.get_count.load(Ordering::Relaxed),
            sets: self.shared.set_count.load(Ordering::Relaxed),
            expired_lazy: self.shared.expired_lazy.load(Ordering::Relaxed),
            expired_swept: self.shared.expired_swept.load(Ordering::Relaxed),
            sweeps: self.shared.sweep_count.load(Ordering::Relaxed),
        }
    }

    /// Cancels the pending sweep so it never fires again.
    ///
    /// One-way and idempotent. Explicit operations remain legal afterwards,
    /// but memory no longer self-reclaims.
    pub fn shutdown(&self) {
        sweep::shutdown(&self.shared);
    }
}

impl<K, V> Default for TtlStore<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for TtlStore<K, V> {
    fn drop(&mut self) {
        sweep::shutdown(&self.shared);
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy)]
pub struct TtlStoreStats {
    /// Entries currently held (including expired entries awaiting reclaim)
    pub keys: u64,
    /// Total GET operations
    pub gets: u64,
    /// Total SETEX operations
    pub sets: u64,
    /// Entries discarded by reads that discovered expiry
    pub expired_lazy: u64,
    /// Entries reclaimed by the background sweep
    pub expired_swept: u64,
    /// Sweep runs completed
    pub sweeps: u64,
}
