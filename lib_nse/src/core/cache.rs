//! # Conditional Cache
//!
//! Bounded memoization for fetch-style operations whose results only change
//! while the exchange is trading.
//!
//! ## Behaviour
//!
//! - A call made with `bypass == true` always runs the operation and never
//!   reads or writes the store.
//! - Otherwise the first call for a key runs the operation and stores its
//!   result; later calls for the same key reuse it. Concurrent callers of the
//!   same key share a single in-flight computation through a per-key
//!   `OnceCell`, so a closed-market window issues at most one upstream call
//!   per key.
//! - Failed computations leave nothing behind; the next caller tries again.
//! - Capacity is bounded by the store. [`LruStore`] evicts the least recently
//!   used key.
//!
//! The bypass decision is made by the caller once, at call entry.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Capacity used by every market-data cache unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 64;

/// Storage behind a [`ConditionalCache`]. Implementations decide eviction.
pub trait CacheStore<K, V>: Send {
    /// Looks a key up, refreshing its recency if the policy tracks it.
    fn get(&mut self, key: &K) -> Option<V>;
    /// Inserts or replaces a value, evicting as needed.
    fn insert(&mut self, key: K, value: V);
    /// Removes a single key.
    fn remove(&mut self, key: &K) -> Option<V>;
    /// Drops every entry.
    fn clear(&mut self);
    /// Number of stored entries.
    fn len(&self) -> usize;
    /// `true` when nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Least-recently-used store with a fixed capacity.
///
/// Recency is a monotonically increasing tick; `order` maps tick → key so the
/// oldest entry is always the first one in the `BTreeMap`.
pub struct LruStore<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
}

impl<K: Hash + Eq + Clone, V: Clone> LruStore<K, V> {
    /// Creates a store holding at most `capacity` entries. A capacity of zero stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tick: 0,
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
        }
    }
}

impl<K, V> CacheStore<K, V> for LruStore<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.next_tick();
        let (value, stamp) = self.entries.get_mut(key)?;
        self.order.remove(&*stamp);
        *stamp = tick;
        self.order.insert(tick, key.clone());
        Some(value.clone())
    }

    fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let tick = self.next_tick();
        if let Some((_, old_stamp)) = self.entries.remove(&key) {
            self.order.remove(&old_stamp);
        }
        while self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.order.insert(tick, key.clone());
        self.entries.insert(key, (value, tick));
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let (value, stamp) = self.entries.remove(key)?;
        self.order.remove(&stamp);
        Some(value)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Counters describing how a cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the store (including joins on an in-flight computation).
    pub hits: u64,
    /// Calls that ran the operation while caching was active.
    pub misses: u64,
    /// Calls that ran the operation with caching disabled.
    pub bypasses: u64,
    /// Entries currently stored.
    pub len: usize,
}

/// Per-key slot shared by concurrent callers of the same key.
pub type Slot<V> = Arc<OnceCell<V>>;

/// # Conditional Cache
///
/// Wraps fetch-style operations with LRU memoization that the caller can
/// switch off per call.
pub struct ConditionalCache<K, V, S = LruStore<K, Slot<V>>> {
    store: Mutex<S>,
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    _marker: std::marker::PhantomData<fn(K) -> V>,
}

impl<K, V> ConditionalCache<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send + Sync,
{
    /// Creates a cache backed by an [`LruStore`] of the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_store(LruStore::new(capacity))
    }
}

impl<K, V, S> ConditionalCache<K, V, S>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send + Sync,
    S: CacheStore<K, Slot<V>>,
{
    /// Creates a cache backed by a custom store.
    pub fn with_store(store: S) -> Self {
        Self {
            store: Mutex::new(store),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            bypasses: AtomicU64::new(0),
            _marker: std::marker::PhantomData,
        }
    }

    /// Returns the cached value for `key`, or runs `compute` to produce it.
    ///
    /// ## Logic:
    /// 1.  `bypass == true`: run `compute` and hand the result straight back.
    /// 2.  Otherwise fetch (or create) the key's slot under the store lock.
    /// 3.  Initialise the slot outside the lock; concurrent callers wait on the
    ///     same slot instead of calling upstream again.
    /// 4.  On error the slot stays empty and is dropped from the store.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: K, bypass: bool, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if bypass {
            self.bypasses.fetch_add(1, Ordering::Relaxed);
            return compute().await;
        }

        let slot = {
            let mut store = self.store.lock().expect("cache lock poisoned");
            match store.get(&key) {
                Some(slot) => slot,
                None => {
                    let slot: Slot<V> = Arc::new(OnceCell::new());
                    store.insert(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };

        if let Some(value) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value.clone());
        }

        let mut ran = false;
        let outcome = slot
            .get_or_try_init(|| {
                ran = true;
                compute()
            })
            .await
            .map(V::clone);

        if ran {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        if outcome.is_err() {
            let mut store = self.store.lock().expect("cache lock poisoned");
            if let Some(current) = store.get(&key) {
                if Arc::ptr_eq(&current, &slot) && current.get().is_none() {
                    store.remove(&key);
                }
            }
        }

        outcome
    }

    /// Reads a stored value without computing anything.
    pub fn peek(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock().expect("cache lock poisoned");
        store.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Drops every stored entry. Counters are kept.
    pub fn clear(&self) {
        self.store.lock().expect("cache lock poisoned").clear();
    }

    /// Current counters and size.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            len: self.store.lock().expect("cache lock poisoned").len(),
        }
    }
}
