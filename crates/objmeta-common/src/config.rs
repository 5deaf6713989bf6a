//! Configuration types for objmeta
//!
//! Every section deserializes with defaults so a partial TOML file (or none
//! at all) yields a usable configuration.

use crate::types::AclType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the metadata apply path
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Enforce ACL checks on requests
    pub acls_enabled: bool,
    /// redb database file
    pub db_path: PathBuf,
    /// Number of applied log entries written per flush
    pub flush_batch_size: usize,
    /// Authorization configuration
    pub acl: AclConfig,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            acls_enabled: false,
            db_path: PathBuf::from("/var/lib/objmeta/om.redb"),
            flush_batch_size: 128,
            acl: AclConfig::default(),
        }
    }
}

/// Static ACL grants used when no external policy engine is wired in
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Users allowed everything regardless of grants
    pub admins: Vec<String>,
    pub grants: Vec<AclGrant>,
}

/// A set of rights for one user on a namespace prefix
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclGrant {
    pub user: String,
    pub volume: String,
    /// Unset = every bucket in the volume
    #[serde(default)]
    pub bucket: Option<String>,
    /// Unset = every key in the bucket(s)
    #[serde(default)]
    pub key: Option<String>,
    pub acls: Vec<AclType>,
}
