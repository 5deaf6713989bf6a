//! Redb table definitions for persistent metadata storage.
//!
//! All values are bincode-encoded. Row keys are slash-separated paths, see
//! the key builders on [`crate::MetaStore`].

use redb::TableDefinition;

pub type BytesTable = TableDefinition<'static, &'static str, &'static [u8]>;

// Namespace
// Key: "/{volume}", Value: VolumeInfo
pub const VOLUMES: BytesTable = TableDefinition::new("volumes");
// Key: "/{volume}/{bucket}", Value: BucketInfo
pub const BUCKETS: BytesTable = TableDefinition::new("buckets");

// Keys
// Key: "/{volume}/{bucket}/{key}/{client_id}", Value: KeyInfo (pending write)
pub const OPEN_KEYS: BytesTable = TableDefinition::new("open_keys");
// Key: "/{volume}/{bucket}/{key}", Value: KeyInfo (committed)
pub const KEYS: BytesTable = TableDefinition::new("keys");

pub const ALL: [BytesTable; 4] = [VOLUMES, BUCKETS, OPEN_KEYS, KEYS];
