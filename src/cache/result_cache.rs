//! Read-through result cache with one fill in flight per key.
//!
//! ## Design
//!
//! - Slots live in a sharded `DashMap`, so unrelated keys never contend on a
//!   common lock.
//! - A missing key is filled by a boxed future wrapped in
//!   [`futures::future::Shared`]; every concurrent caller for that key awaits
//!   the same future and receives the same `Ok` or `Err`.
//! - Each fill is stamped with a generation. A fill only installs its value if
//!   its own slot is still present, so invalidating an in-flight key answers
//!   the callers already waiting but forces the next lookup to recompute.
//! - A filling slot holds only a weak handle to its future. When every
//!   waiter is dropped the fill is cancelled; the dead slot is replaced by the
//!   next lookup of that key or swept on the next eviction pass.
//! - No DashMap guard is held across an `.await`.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

type FillFuture<V, E> = BoxFuture<'static, Result<Arc<V>, E>>;
type SharedFill<V, E> = Shared<FillFuture<V, E>>;

enum Slot<V, E> {
    Ready { value: Arc<V>, last_access: Instant },
    Filling { fill: WeakShared<FillFuture<V, E>>, generation: u64 },
}

impl<V, E> Slot<V, E> {
    /// Return the value and refresh its idle deadline if still fresh.
    fn touch(&mut self, now: Instant, time_to_idle: Duration) -> Option<Arc<V>> {
        match self {
            Slot::Ready { value, last_access }
                if now.duration_since(*last_access) < time_to_idle =>
            {
                *last_access = now;
                Some(Arc::clone(value))
            }
            _ => None,
        }
    }

    fn is_fill(&self, expected: u64) -> bool {
        matches!(self, Slot::Filling { generation, .. } if *generation == expected)
    }

    fn is_expired(&self, now: Instant, time_to_idle: Duration) -> bool {
        matches!(self, Slot::Ready { last_access, .. } if now.duration_since(*last_access) >= time_to_idle)
    }

    /// A fill whose waiters are all gone.
    fn is_abandoned(&self) -> bool {
        matches!(self, Slot::Filling { fill, .. } if fill.upgrade().is_none())
    }
}

/// Bounded, idle-expiring memo of `K -> Arc<V>` with failures of type `E`.
pub struct ResultCache<K, V, E> {
    slots: Arc<DashMap<K, Slot<V, E>>>,
    generation: AtomicU64,
    max_entries: usize,
    time_to_idle: Duration,
}

impl<K, V, E> ResultCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(max_entries: usize, time_to_idle: Duration) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            max_entries,
            time_to_idle,
        }
    }

    /// Return the cached value for `key`, or run `compute` to fill it.
    ///
    /// Concurrent callers with an equal key share a single run of `compute`.
    /// A failed fill is returned to all of them and leaves the key empty.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let now = Instant::now();
        let fill = match self.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let joined = match occupied.get_mut() {
                    Slot::Filling { fill, .. } => fill.upgrade(),
                    slot => {
                        if let Some(value) = slot.touch(now, self.time_to_idle) {
                            log::trace!("result cache hit");
                            return Ok(value);
                        }
                        None
                    }
                };

                match joined {
                    Some(fill) => {
                        log::trace!("result cache: joining in-flight fill");
                        fill
                    }
                    None => {
                        log::debug!("result cache entry expired or abandoned, refilling");
                        let (fill, slot) = self.start_fill(key, compute);
                        match slot {
                            Some(slot) => {
                                occupied.insert(slot);
                            }
                            None => {
                                occupied.remove();
                            }
                        }
                        fill
                    }
                }
            }
            Entry::Vacant(vacant) => {
                log::debug!("result cache miss");
                let (fill, slot) = self.start_fill(key, compute);
                if let Some(slot) = slot {
                    vacant.insert(slot);
                }
                fill
            }
        };

        fill.await
    }

    fn start_fill<F, Fut>(&self, key: K, compute: F) -> (SharedFill<V, E>, Option<Slot<V, E>>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let slots = Arc::clone(&self.slots);
        let max_entries = self.max_entries;
        let time_to_idle = self.time_to_idle;
        let pending = compute();

        let fill = async move {
            let result = pending.await.map(Arc::new);
            settle(&slots, &key, generation, &result, max_entries, time_to_idle);
            result
        }
        .boxed()
        .shared();

        // an unpolled future always downgrades
        let slot = fill
            .downgrade()
            .map(|weak| Slot::Filling { fill: weak, generation });
        (fill, slot)
    }

    /// Drop every entry, ready or in flight, whose key matches `predicate`.
    ///
    /// Returns the number of entries removed. Lookups that start after this
    /// returns never observe a removed value.
    pub fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let mut removed = 0;
        self.slots.retain(|key, _| {
            let keep = !predicate(key);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn invalidate_all(&self) {
        self.slots.clear();
    }

    /// Number of ready entries.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn settle<K, V, E>(
    slots: &DashMap<K, Slot<V, E>>,
    key: &K,
    generation: u64,
    result: &Result<Arc<V>, E>,
    max_entries: usize,
    time_to_idle: Duration,
) where
    K: Eq + Hash + Clone,
{
    match result {
        Ok(value) => {
            let installed = match slots.get_mut(key) {
                Some(mut slot) if slot.is_fill(generation) => {
                    *slot = Slot::Ready {
                        value: Arc::clone(value),
                        last_access: Instant::now(),
                    };
                    true
                }
                _ => false,
            };

            if installed {
                evict(slots, max_entries, time_to_idle);
            } else {
                log::debug!("result cache: fill invalidated while in flight, not stored");
            }
        }
        Err(_) => {
            slots.remove_if(key, |_, slot| slot.is_fill(generation));
        }
    }
}

/// Drop idle entries and abandoned fills, then least recently used ones
/// until within capacity.
fn evict<K, V, E>(slots: &DashMap<K, Slot<V, E>>, max_entries: usize, time_to_idle: Duration)
where
    K: Eq + Hash + Clone,
{
    let now = Instant::now();
    slots.retain(|_, slot| !slot.is_expired(now, time_to_idle) && !slot.is_abandoned());

    loop {
        let mut ready = 0usize;
        let mut oldest: Option<(K, Instant)> = None;
        for entry in slots.iter() {
            if let Slot::Ready { last_access, .. } = entry.value() {
                ready += 1;
                if oldest.as_ref().is_none_or(|(_, at)| last_access < at) {
                    oldest = Some((entry.key().clone(), *last_access));
                }
            }
        }

        if ready <= max_entries {
            break;
        }
        let Some((key, stamp)) = oldest else {
            break;
        };
        log::debug!("result cache over capacity ({ready} > {max_entries}), evicting LRU entry");
        slots.remove_if(&key, |_, slot| {
            matches!(slot, Slot::Ready { last_access, .. } if *last_access == stamp)
        });
    }
}
