//! Metadata store: redb database, cached tables, and namespace locks.
//!
//! The apply path mutates only the table caches, through
//! [`MetaStore::apply_cache_batch`]. Persistence happens later in
//! [`MetaStore::flush`], which writes a batch in one redb write transaction
//! and then evicts the cache entries it made durable.

use crate::cache::CacheValue;
use crate::lock::LockManager;
use crate::table::Table;
use crate::tables;
use objmeta_common::{BucketInfo, KeyInfo, VolumeInfo};
use parking_lot::RwLock;
use redb::{Database, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Error type for metadata store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl From<StoreError> for objmeta_common::Error {
    fn from(e: StoreError) -> Self {
        Self::store(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A row change produced by one applied log entry
#[derive(Clone, Debug)]
pub enum CacheOp {
    OpenKey { key: String, value: Option<KeyInfo> },
    Key { key: String, value: Option<KeyInfo> },
}

/// All cache changes of one log entry, applied as a unit
#[derive(Clone, Debug)]
pub struct CacheBatch {
    epoch: u64,
    ops: Vec<CacheOp>,
}

impl CacheBatch {
    pub const fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ops: Vec::new(),
        }
    }

    #[must_use]
    pub fn delete_open_key(mut self, key: impl Into<String>) -> Self {
        self.ops.push(CacheOp::OpenKey {
            key: key.into(),
            value: None,
        });
        self
    }

    #[must_use]
    pub fn put_key(mut self, key: impl Into<String>, info: KeyInfo) -> Self {
        self.ops.push(CacheOp::Key {
            key: key.into(),
            value: Some(info),
        });
        self
    }
}

fn cache_value(value: Option<KeyInfo>, epoch: u64) -> CacheValue<KeyInfo> {
    match value {
        Some(info) => CacheValue::present(info, epoch),
        None => CacheValue::tombstone(epoch),
    }
}

/// Persistent metadata store backed by redb, with cached tables.
pub struct MetaStore {
    db: Arc<Database>,
    volume_table: Table<VolumeInfo>,
    bucket_table: Table<BucketInfo>,
    open_key_table: Table<KeyInfo>,
    key_table: Table<KeyInfo>,
    lock: LockManager,
    /// Writers hold this exclusively while a cache batch lands; readers that
    /// need a view spanning several tables hold it shared.
    apply_barrier: RwLock<()>,
    last_applied: AtomicU64,
    durable_through: AtomicU64,
}

impl MetaStore {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create all tables eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        for def in tables::ALL {
            let _t = write_txn.open_table(def)?;
        }
        write_txn.commit()?;

        let db = Arc::new(db);
        info!("Opened metadata store at {:?}", path);
        Ok(Self {
            volume_table: Table::new("volumes", tables::VOLUMES, Arc::clone(&db)),
            bucket_table: Table::new("buckets", tables::BUCKETS, Arc::clone(&db)),
            open_key_table: Table::new("open_keys", tables::OPEN_KEYS, Arc::clone(&db)),
            key_table: Table::new("keys", tables::KEYS, Arc::clone(&db)),
            db,
            lock: LockManager::new(),
            apply_barrier: RwLock::new(()),
            last_applied: AtomicU64::new(0),
            durable_through: AtomicU64::new(0),
        })
    }

    // ---- Row keys ----

    pub fn volume_key(volume: &str) -> String {
        format!("/{volume}")
    }

    pub fn bucket_key(volume: &str, bucket: &str) -> String {
        format!("/{volume}/{bucket}")
    }

    pub fn ozone_key(volume: &str, bucket: &str, key: &str) -> String {
        format!("/{volume}/{bucket}/{key}")
    }

    pub fn open_key(volume: &str, bucket: &str, key: &str, client_id: u64) -> String {
        format!("/{volume}/{bucket}/{key}/{client_id}")
    }

    // ---- Handles ----

    pub const fn volume_table(&self) -> &Table<VolumeInfo> {
        &self.volume_table
    }

    pub const fn bucket_table(&self) -> &Table<BucketInfo> {
        &self.bucket_table
    }

    pub const fn open_key_table(&self) -> &Table<KeyInfo> {
        &self.open_key_table
    }

    pub const fn key_table(&self) -> &Table<KeyInfo> {
        &self.key_table
    }

    pub const fn lock(&self) -> &LockManager {
        &self.lock
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ---- Apply path ----

    /// Land every cache change of one log entry together. A reader inside
    /// [`Self::consistent_read`] sees either none or all of them.
    pub fn apply_cache_batch(&self, batch: CacheBatch) {
        let CacheBatch { epoch, ops } = batch;
        let _barrier = self.apply_barrier.write();
        for op in ops {
            match op {
                CacheOp::OpenKey { key, value } => {
                    self.open_key_table
                        .add_cache_entry(key, cache_value(value, epoch));
                }
                CacheOp::Key { key, value } => {
                    self.key_table.add_cache_entry(key, cache_value(value, epoch));
                }
            }
        }
        self.last_applied.fetch_max(epoch, Ordering::AcqRel);
        debug!("Applied cache batch at epoch {}", epoch);
    }

    /// Run `f` with no cache batch landing concurrently
    pub fn consistent_read<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _barrier = self.apply_barrier.read();
        f(self)
    }

    /// Highest epoch whose cache batch has been applied
    pub fn last_applied_index(&self) -> u64 {
        self.last_applied.load(Ordering::Acquire)
    }

    /// Highest epoch known to be persisted by [`Self::flush`]
    pub fn durable_index(&self) -> u64 {
        self.durable_through.load(Ordering::Acquire)
    }

    // ---- Flush ----

    /// Persist a batch staged by `stage` and evict the cache entries it
    /// covers. `stage` must write every row change applied at epochs up to
    /// `through`, otherwise evicted rows fall back to stale disk values.
    pub fn flush<F>(&self, through: u64, stage: F) -> StoreResult<usize>
    where
        F: FnOnce(&WriteTransaction) -> StoreResult<()>,
    {
        let write_txn = self.db.begin_write()?;
        stage(&write_txn)?;
        write_txn.commit()?;

        let evicted = self.volume_table.cleanup_cache(through)
            + self.bucket_table.cleanup_cache(through)
            + self.open_key_table.cleanup_cache(through)
            + self.key_table.cleanup_cache(through);
        self.durable_through.fetch_max(through, Ordering::AcqRel);

        info!(
            "Flushed metadata through epoch {} ({} cache entries evicted)",
            through, evicted
        );
        Ok(evicted)
    }

    // ---- Bootstrap writes (direct to disk) ----

    pub fn put_volume(&self, volume: &VolumeInfo) -> StoreResult<()> {
        self.volume_table
            .put(&Self::volume_key(&volume.volume_name), volume)
    }

    pub fn put_bucket(&self, bucket: &BucketInfo) -> StoreResult<()> {
        self.bucket_table.put(
            &Self::bucket_key(&bucket.volume_name, &bucket.bucket_name),
            bucket,
        )
    }

    pub fn put_open_key(&self, client_id: u64, info: &KeyInfo) -> StoreResult<()> {
        self.open_key_table.put(
            &Self::open_key(
                &info.volume_name,
                &info.bucket_name,
                &info.key_name,
                client_id,
            ),
            info,
        )
    }
}
