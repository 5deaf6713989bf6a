//! Epoch-tagged table cache
//!
//! Each table keeps an in-memory overlay of the rows written by applied log
//! entries that have not been flushed yet. Every entry carries the epoch
//! (log index) that produced it and is either a value or a tombstone:
//!
//! - `Exists(v)`: the row was written at some epoch and is `v`
//! - `NotExist`: the row was deleted at some epoch (tombstone)
//! - `Miss`: the cache knows nothing, read the persistent table
//!
//! Entries are only dropped by [`TableCache::cleanup`] once the persistent
//! table durably holds every epoch up to the watermark. A later write to the
//! same row survives cleanup of an earlier epoch.

use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use tracing::debug;

/// Versioned "value or tombstone" for one row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheValue<V> {
    value: Option<V>,
    epoch: u64,
}

impl<V> CacheValue<V> {
    /// A row written at `epoch`
    pub const fn present(value: V, epoch: u64) -> Self {
        Self {
            value: Some(value),
            epoch,
        }
    }

    /// A row deleted at `epoch`
    pub const fn tombstone(epoch: u64) -> Self {
        Self { value: None, epoch }
    }

    pub const fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub const fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// Outcome of a cache lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheResult<V> {
    Exists(V),
    NotExist,
    Miss,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheValue<V>>,
    /// epoch -> keys written at that epoch, for cleanup
    epochs: BTreeMap<u64, Vec<K>>,
}

/// In-memory overlay for one table
pub struct TableCache<K, V> {
    state: RwLock<CacheState<K, V>>,
}

impl<K, V> TableCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                epochs: BTreeMap::new(),
            }),
        }
    }

    /// Record a row version. An entry older than the one already cached is
    /// ignored so the newest epoch always wins; returns whether it was kept.
    pub fn put(&self, key: K, value: CacheValue<V>) -> bool {
        let mut state = self.state.write();
        if let Some(existing) = state.entries.get(&key)
            && existing.epoch > value.epoch
        {
            debug!(
                "Ignoring cache entry at epoch {} older than cached epoch {}",
                value.epoch, existing.epoch
            );
            return false;
        }
        state.epochs.entry(value.epoch).or_default().push(key.clone());
        state.entries.insert(key, value);
        true
    }

    /// Look up a row
    pub fn get<Q>(&self, key: &Q) -> CacheResult<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let state = self.state.read();
        match state.entries.get(key) {
            Some(CacheValue {
                value: Some(value), ..
            }) => CacheResult::Exists(value.clone()),
            Some(CacheValue { value: None, .. }) => CacheResult::NotExist,
            None => CacheResult::Miss,
        }
    }

    /// Raw cached entry (value or tombstone) with its epoch
    pub fn entry<Q>(&self, key: &Q) -> Option<CacheValue<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.read().entries.get(key).cloned()
    }

    /// Drop entries produced at or before `epoch` unless a newer write to the
    /// same row superseded them. Returns the number of evicted entries.
    pub fn cleanup(&self, epoch: u64) -> usize {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let flushed = match epoch.checked_add(1) {
            Some(next) => {
                let pending = state.epochs.split_off(&next);
                std::mem::replace(&mut state.epochs, pending)
            }
            None => std::mem::take(&mut state.epochs),
        };

        let mut evicted = 0;
        for (written_at, keys) in flushed {
            for key in keys {
                if state
                    .entries
                    .get(&key)
                    .is_some_and(|v| v.epoch == written_at)
                {
                    state.entries.remove(&key);
                    evicted += 1;
                }
            }
        }
        evicted
    }

    /// Number of cached rows (values and tombstones)
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for TableCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
