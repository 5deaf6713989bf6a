//! Namespace locks
//!
//! One reentrant mutex per locked path. A lock is taken with
//! [`LockManager::acquire`] and held by the returned guard; dropping the guard
//! releases it on every exit path, including unwinding. Locks on different
//! paths never contend.

use parking_lot::lock_api::ArcReentrantMutexGuard;
use parking_lot::{Mutex, RawMutex, RawThreadId, ReentrantMutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Locked namespace resource
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LockKey {
    Bucket { volume: String, bucket: String },
}

impl LockKey {
    pub fn bucket(volume: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self::Bucket {
            volume: volume.into(),
            bucket: bucket.into(),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket { volume, bucket } => write!(f, "BUCKET_LOCK /{volume}/{bucket}"),
        }
    }
}

type PathMutex = Arc<ReentrantMutex<()>>;

/// Holds a namespace lock until dropped
pub struct LockGuard<'a> {
    key: LockKey,
    manager: &'a LockManager,
    guard: Option<ArcReentrantMutexGuard<RawMutex, RawThreadId, ()>>,
}

impl LockGuard<'_> {
    pub const fn key(&self) -> &LockKey {
        &self.key
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the registry sees only its own reference
        drop(self.guard.take());
        self.manager.release_unused(&self.key);
        debug!("Released {}", self.key);
    }
}

/// Registry of namespace locks. An entry lives only while some guard holds
/// or waits on it.
#[derive(Default)]
pub struct LockManager {
    locks: Mutex<HashMap<LockKey, PathMutex>>,
    acquisitions: AtomicU64,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock for `key` is held by this thread. Reentrant: a
    /// thread already holding the lock gets another guard immediately.
    pub fn acquire(&self, key: LockKey) -> LockGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock();
            Arc::clone(
                locks
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
            )
        };
        let guard = mutex.lock_arc();
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        debug!("Acquired {}", key);
        LockGuard {
            key,
            manager: self,
            guard: Some(guard),
        }
    }

    pub fn acquire_bucket_lock(&self, volume: &str, bucket: &str) -> LockGuard<'_> {
        self.acquire(LockKey::bucket(volume, bucket))
    }

    /// Drop the entry for `key` if the registry holds the only reference.
    /// Waiters clone the mutex under the registry lock, so a count of one
    /// means nobody holds or waits on it.
    fn release_unused(&self, key: &LockKey) {
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|m| Arc::strong_count(m) == 1) {
            locks.remove(key);
        }
    }

    /// Whether any thread currently holds the lock for `key`
    pub fn is_locked(&self, key: &LockKey) -> bool {
        self.locks.lock().get(key).is_some_and(|m| m.is_locked())
    }

    /// Number of locks currently held or waited on
    pub fn active_locks(&self) -> usize {
        self.locks.lock().len()
    }

    /// Total successful acquisitions since creation
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}
