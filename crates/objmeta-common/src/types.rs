//! Core type definitions for objmeta
//!
//! This module defines the namespace entries (volumes, buckets, keys), the
//! block location descriptors carried by commit requests, and the
//! resource/ACL vocabulary used by authorization.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a block on the storage nodes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    /// Container holding the block
    pub container_id: u64,
    /// Block id local to the container
    pub local_id: u64,
}

impl BlockId {
    #[must_use]
    pub const fn new(container_id: u64, local_id: u64) -> Self {
        Self {
            container_id,
            local_id,
        }
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({}:{})", self.container_id, self.local_id)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conID: {} locID: {}", self.container_id, self.local_id)
    }
}

/// One block descriptor of a key. The ordered list of these is the key's
/// readable byte stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLocation {
    pub block_id: BlockId,
    /// Byte offset of this block within the key
    pub offset: u64,
    /// Number of bytes stored in this block
    pub length: u64,
}

impl KeyLocation {
    #[must_use]
    pub const fn new(block_id: BlockId, offset: u64, length: u64) -> Self {
        Self {
            block_id,
            offset,
            length,
        }
    }
}

/// Arguments of a key request as sent by the client
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyArgs {
    pub volume_name: String,
    pub bucket_name: String,
    pub key_name: String,
    #[serde(default)]
    pub data_size: u64,
    #[serde(default)]
    pub key_locations: Vec<KeyLocation>,
    /// Unix millis. Filled in by request pre-processing when absent.
    #[serde(default)]
    pub modification_time: Option<u64>,
}

/// Caller identity attached to a request before it is applied
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_name: String,
    #[serde(default)]
    pub remote_address: Option<String>,
}

impl UserInfo {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            remote_address: None,
        }
    }

    #[must_use]
    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.remote_address = Some(address.into());
        self
    }
}

/// Metadata of a key, stored in both the open-key table (pending) and the
/// key table (committed).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub volume_name: String,
    pub bucket_name: String,
    pub key_name: String,
    pub data_size: u64,
    pub key_locations: Vec<KeyLocation>,
    /// Unix millis
    pub creation_time: u64,
    /// Unix millis
    pub modification_time: u64,
    pub owner: String,
}

impl KeyInfo {
    /// Replace the block list. The previous list is discarded, not merged.
    pub fn update_location_info_list(&mut self, locations: Vec<KeyLocation>) {
        self.key_locations = locations;
    }

    /// Sum of the block lengths. Not required to match `data_size`.
    #[must_use]
    pub fn located_bytes(&self) -> u64 {
        self.key_locations.iter().map(|l| l.length).sum()
    }
}

/// Volume entry (top level of the namespace)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub volume_name: String,
    pub owner: String,
    #[serde(default)]
    pub creation_time: u64,
}

/// Bucket entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub volume_name: String,
    pub bucket_name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub creation_time: u64,
}

/// Kind of namespace object an ACL check targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ResourceType {
    #[display("VOLUME")]
    Volume,
    #[display("BUCKET")]
    Bucket,
    #[display("KEY")]
    Key,
}

/// ACL right being requested
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclType {
    #[display("READ")]
    Read,
    #[display("WRITE")]
    Write,
    #[display("CREATE")]
    Create,
    #[display("LIST")]
    List,
    #[display("DELETE")]
    Delete,
    #[display("READ_ACL")]
    ReadAcl,
    #[display("WRITE_ACL")]
    WriteAcl,
    #[display("ALL")]
    All,
}

impl AclType {
    /// Whether holding `self` satisfies a request for `wanted`
    #[must_use]
    pub fn grants(self, wanted: Self) -> bool {
        self == Self::All || self == wanted
    }
}

/// Current wall-clock time in unix millis
#[must_use]
pub fn current_timestamp_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_info() -> KeyInfo {
        KeyInfo {
            volume_name: "vol1".into(),
            bucket_name: "bucket1".into(),
            key_name: "key1".into(),
            data_size: 0,
            key_locations: vec![KeyLocation::new(BlockId::new(1, 1), 0, 10)],
            creation_time: 1,
            modification_time: 1,
            owner: "alice".into(),
        }
    }

    #[test]
    fn test_update_location_info_list_replaces() {
        let mut info = key_info();
        info.update_location_info_list(vec![
            KeyLocation::new(BlockId::new(2, 7), 0, 512),
            KeyLocation::new(BlockId::new(2, 8), 512, 512),
        ]);
        assert_eq!(info.key_locations.len(), 2);
        assert_eq!(info.key_locations[0].block_id, BlockId::new(2, 7));
        assert_eq!(info.located_bytes(), 1024);
    }

    #[test]
    fn test_update_location_info_list_empty() {
        let mut info = key_info();
        info.update_location_info_list(Vec::new());
        assert!(info.key_locations.is_empty());
        assert_eq!(info.located_bytes(), 0);
    }

    #[test]
    fn test_acl_grants() {
        assert!(AclType::All.grants(AclType::Write));
        assert!(AclType::Write.grants(AclType::Write));
        assert!(!AclType::Read.grants(AclType::Write));
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceType::Key.to_string(), "KEY");
        assert_eq!(AclType::WriteAcl.to_string(), "WRITE_ACL");
        assert_eq!(BlockId::new(3, 4).to_string(), "conID: 3 locID: 4");
    }
}
