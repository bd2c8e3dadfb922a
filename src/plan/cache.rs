//! Process-wide execution plan cache.
//!
//! Plans are published insert-if-absent: when two callers race to build the
//! same shape, the first published plan wins and both get it back. The
//! unbounded store keeps plans for the process lifetime; the bounded store
//! evicts the least recently used plan.

use std::any::Any;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use lru::LruCache;
use serde::Serialize;

use super::ExecutionPlan;
use super::key::PlanKey;

type SharedPlan = Arc<dyn Any + Send + Sync>;

enum Store {
    Unbounded(DashMap<PlanKey, SharedPlan>),
    Bounded(Mutex<LruCache<PlanKey, SharedPlan>>),
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct PlanCache {
    store: Store,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache").field("stats", &self.stats()).finish()
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl PlanCache {
    pub fn unbounded() -> Self {
        Self::with_store(Store::Unbounded(DashMap::new()))
    }

    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self::with_store(Store::Bounded(Mutex::new(LruCache::new(capacity))))
    }

    /// Bounded when a non-zero capacity is given.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    fn with_store(store: Store) -> Self {
        Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(
        lru: &Mutex<LruCache<PlanKey, SharedPlan>>,
    ) -> std::sync::MutexGuard<'_, LruCache<PlanKey, SharedPlan>> {
        lru.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached plan of `key`, counting a hit or a miss.
    pub fn get<E: 'static>(&self, key: &PlanKey) -> Option<Arc<ExecutionPlan<E>>> {
        let found = match &self.store {
            Store::Unbounded(map) => map.get(key).map(|entry| entry.value().clone()),
            Store::Bounded(lru) => Self::lock(lru).get(key).cloned(),
        };
        match found.and_then(|plan| plan.downcast::<ExecutionPlan<E>>().ok()) {
            Some(plan) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(plan)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Publish `plan` unless a plan for `key` already exists; returns the
    /// plan that ended up cached.
    pub fn publish<E: 'static>(
        &self,
        key: PlanKey,
        plan: Arc<ExecutionPlan<E>>,
    ) -> Arc<ExecutionPlan<E>> {
        let winner = match &self.store {
            Store::Unbounded(map) => map
                .entry(key)
                .or_insert_with(|| plan.clone() as SharedPlan)
                .value()
                .clone(),
            Store::Bounded(lru) => Self::lock(lru)
                .get_or_insert(key, || plan.clone() as SharedPlan)
                .clone(),
        };
        winner.downcast::<ExecutionPlan<E>>().unwrap_or(plan)
    }

    pub fn len(&self) -> usize {
        match &self.store {
            Store::Unbounded(map) => map.len(),
            Store::Bounded(lru) => Self::lock(lru).len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of a bounded cache.
    pub fn capacity(&self) -> Option<usize> {
        match &self.store {
            Store::Unbounded(_) => None,
            Store::Bounded(lru) => Some(Self::lock(lru).cap().get()),
        }
    }

    /// Drop every plan, e.g. after DDL changed a table.
    pub fn clear(&self) {
        match &self.store {
            Store::Unbounded(map) => map.clear(),
            Store::Bounded(lru) => Self::lock(lru).clear(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
