//! objmeta Metadata Store - cached tables over redb
//!
//! This crate implements the table layer the apply path works against:
//! epoch-tagged caches in front of persistent redb tables, plus the
//! namespace lock registry.

pub mod cache;
pub mod lock;
pub mod store;
pub mod table;
pub mod tables;

// Re-exports
pub use cache::{CacheResult, CacheValue, TableCache};
pub use lock::{LockGuard, LockKey, LockManager};
pub use store::{CacheBatch, CacheOp, MetaStore, StoreError, StoreResult};
pub use table::Table;
