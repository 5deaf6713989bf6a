//! Typed table: a redb table with an epoch-tagged cache in front of it.
//!
//! Reads consult the cache first and only fall back to redb on a miss, so a
//! tombstone hides a row that is still present on disk until the flush that
//! deletes it. Writes from the apply path only touch the cache; persistent
//! writes go through a write transaction supplied by the flusher.

use crate::cache::{CacheResult, CacheValue, TableCache};
use crate::store::StoreResult;
use crate::tables::BytesTable;
use redb::{Database, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

pub struct Table<V> {
    name: &'static str,
    def: BytesTable,
    db: Arc<Database>,
    cache: TableCache<String, V>,
}

impl<V> Table<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub(crate) fn new(name: &'static str, def: BytesTable, db: Arc<Database>) -> Self {
        Self {
            name,
            def,
            db,
            cache: TableCache::new(),
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Get a row, cache first. A single lookup does not wait for an
    /// in-flight cache batch; readers combining rows from several tables use
    /// [`crate::MetaStore::consistent_read`].
    pub fn get(&self, key: &str) -> StoreResult<Option<V>> {
        match self.cache.get(key) {
            CacheResult::Exists(value) => Ok(Some(value)),
            CacheResult::NotExist => Ok(None),
            CacheResult::Miss => self.get_from_db(key),
        }
    }

    pub fn is_exist(&self, key: &str) -> StoreResult<bool> {
        match self.cache.get(key) {
            CacheResult::Exists(_) => Ok(true),
            CacheResult::NotExist => Ok(false),
            CacheResult::Miss => {
                let read_txn = self.db.begin_read()?;
                let table = read_txn.open_table(self.def)?;
                Ok(table.get(key)?.is_some())
            }
        }
    }

    /// Record a row version produced by an applied log entry
    pub fn add_cache_entry(&self, key: impl Into<String>, value: CacheValue<V>) -> bool {
        self.cache.put(key.into(), value)
    }

    pub const fn cache(&self) -> &TableCache<String, V> {
        &self.cache
    }

    /// Drop cache entries the persistent table already reflects
    pub fn cleanup_cache(&self, epoch: u64) -> usize {
        let evicted = self.cache.cleanup(epoch);
        debug!("Evicted {} {} cache entries through {}", evicted, self.name(), epoch);
        evicted
    }

    /// Stage a put in a flush batch
    pub fn put_with_batch(&self, txn: &WriteTransaction, key: &str, value: &V) -> StoreResult<()> {
        let bytes = bincode::serialize(value)?;
        let mut table = txn.open_table(self.def)?;
        table.insert(key, bytes.as_slice())?;
        Ok(())
    }

    /// Stage a delete in a flush batch
    pub fn delete_with_batch(&self, txn: &WriteTransaction, key: &str) -> StoreResult<()> {
        let mut table = txn.open_table(self.def)?;
        table.remove(key)?;
        Ok(())
    }

    /// Write a row straight to disk, bypassing the cache
    pub fn put(&self, key: &str, value: &V) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        self.put_with_batch(&write_txn, key, value)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Read a row from disk only, ignoring the cache
    pub fn get_from_db(&self, key: &str) -> StoreResult<Option<V>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.def)?;
        match table.get(key)? {
            Some(val) => Ok(Some(bincode::deserialize(val.value())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables;
    use tempfile::TempDir;

    fn open_table() -> (TempDir, Table<String>) {
        let dir = TempDir::new().unwrap();
        let db = Database::create(dir.path().join("test.redb")).unwrap();
        let write_txn = db.begin_write().unwrap();
        write_txn.open_table(tables::KEYS).unwrap();
        write_txn.commit().unwrap();
        (dir, Table::new("keys", tables::KEYS, Arc::new(db)))
    }

    #[test]
    fn test_falls_back_to_db() {
        let (_dir, table) = open_table();
        table.put("/v/b/k", &"on-disk".to_string()).unwrap();

        assert_eq!(table.get("/v/b/k").unwrap().as_deref(), Some("on-disk"));
        assert!(table.is_exist("/v/b/k").unwrap());
        assert_eq!(table.get("/v/b/other").unwrap(), None);
    }

    #[test]
    fn test_cache_overrides_db() {
        let (_dir, table) = open_table();
        table.put("/v/b/k", &"old".to_string()).unwrap();
        table.add_cache_entry("/v/b/k", CacheValue::present("new".to_string(), 3));

        assert_eq!(table.get("/v/b/k").unwrap().as_deref(), Some("new"));
        assert_eq!(table.get_from_db("/v/b/k").unwrap().as_deref(), Some("old"));
    }

    #[test]
    fn test_tombstone_hides_db_row() {
        let (_dir, table) = open_table();
        table.put("/v/b/k", &"old".to_string()).unwrap();
        table.add_cache_entry("/v/b/k", CacheValue::tombstone(4));

        assert_eq!(table.get("/v/b/k").unwrap(), None);
        assert!(!table.is_exist("/v/b/k").unwrap());
    }

    #[test]
    fn test_batch_then_cleanup() {
        let (_dir, table) = open_table();
        table.add_cache_entry("/v/b/k", CacheValue::present("v1".to_string(), 7));

        let txn = table.db.begin_write().unwrap();
        table.put_with_batch(&txn, "/v/b/k", &"v1".to_string()).unwrap();
        txn.commit().unwrap();

        assert_eq!(table.cleanup_cache(7), 1);
        assert!(table.cache().is_empty());
        assert_eq!(table.get("/v/b/k").unwrap().as_deref(), Some("v1"));

        let txn = table.db.begin_write().unwrap();
        table.delete_with_batch(&txn, "/v/b/k").unwrap();
        txn.commit().unwrap();
        assert_eq!(table.get("/v/b/k").unwrap(), None);
    }
}
