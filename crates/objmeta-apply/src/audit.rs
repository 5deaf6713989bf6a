//! Audit logging types and sinks.
//!
//! Every applied request emits exactly one [`AuditMessage`]. Sinks may fail;
//! the caller logs the failure and carries on, so a broken sink never changes
//! the outcome of a request.

use objmeta_common::{KeyArgs, UserInfo};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

/// Audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CommitKey,
}

impl AuditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CommitKey => "COMMIT_KEY",
        }
    }
}

/// Result of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditResult {
    Success,
    Failure,
}

impl AuditResult {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditMessage {
    pub user: String,
    pub remote_address: Option<String>,
    pub action: AuditAction,
    pub params: BTreeMap<String, String>,
    pub result: AuditResult,
    pub error: Option<String>,
}

impl AuditMessage {
    /// Build a record; `error` set means failure
    pub fn new(
        action: AuditAction,
        params: BTreeMap<String, String>,
        error: Option<&objmeta_common::Error>,
        user_info: Option<&UserInfo>,
    ) -> Self {
        Self {
            user: user_info.map(|u| u.user_name.clone()).unwrap_or_default(),
            remote_address: user_info.and_then(|u| u.remote_address.clone()),
            action,
            params,
            result: if error.is_some() {
                AuditResult::Failure
            } else {
                AuditResult::Success
            },
            error: error.map(ToString::to_string),
        }
    }
}

impl fmt::Display for AuditMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user={} | ip={} | op={} {{",
            self.user,
            self.remote_address.as_deref().unwrap_or("-"),
            self.action.as_str()
        )?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}} | ret={}", self.result.as_str())?;
        if let Some(err) = &self.error {
            write!(f, " | error={err}")?;
        }
        Ok(())
    }
}

/// Audit parameters describing a key request
pub fn build_key_args_audit_map(args: &KeyArgs) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("volume".to_string(), args.volume_name.clone());
    params.insert("bucket".to_string(), args.bucket_name.clone());
    params.insert("key".to_string(), args.key_name.clone());
    params.insert("dataSize".to_string(), args.data_size.to_string());
    let locations: Vec<String> = args
        .key_locations
        .iter()
        .map(|l| format!("{{{} offset: {} length: {}}}", l.block_id, l.offset, l.length))
        .collect();
    params.insert(
        "keyLocationInfo".to_string(),
        format!("[{}]", locations.join(", ")),
    );
    params
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for audit records
pub trait AuditLogger: Send + Sync {
    fn log_write(&self, message: &AuditMessage) -> Result<(), AuditError>;
}

/// Writes audit records as tracing events under the `audit` target
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log_write(&self, message: &AuditMessage) -> Result<(), AuditError> {
        match message.result {
            AuditResult::Success => info!(target: "audit", "{}", message),
            AuditResult::Failure => error!(target: "audit", "{}", message),
        }
        Ok(())
    }
}
