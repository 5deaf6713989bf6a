//! Error types for objmeta
//!
//! Every failure of a metadata request is an [`Error`]. Errors carry a
//! stable [`ResultCode`] for clients and a coarse [`ErrorKind`] that the
//! apply pipeline uses to classify outcomes.

use crate::types::{AclType, ResourceType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for objmeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for objmeta
#[derive(Debug, Error)]
pub enum Error {
    #[error("user {user} does not have {acl} permission on {resource_type} {resource}")]
    PermissionDenied {
        user: String,
        resource_type: ResourceType,
        resource: String,
        acl: AclType,
    },

    #[error("volume not found: {0}")]
    VolumeNotFound(String),

    #[error("bucket not found: {volume}/{bucket}")]
    BucketNotFound { volume: String, bucket: String },

    #[error("{0}")]
    KeyNotFound(String),

    #[error("metadata store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a metadata store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Stable code reported to clients
    #[must_use]
    pub const fn result_code(&self) -> ResultCode {
        match self {
            Self::PermissionDenied { .. } => ResultCode::PermissionDenied,
            Self::VolumeNotFound(_) => ResultCode::VolumeNotFound,
            Self::BucketNotFound { .. } => ResultCode::BucketNotFound,
            Self::KeyNotFound(_) => ResultCode::KeyNotFound,
            Self::Store(_) | Self::Internal(_) => ResultCode::InternalError,
        }
    }

    /// Which precondition (if any) the failure belongs to
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.result_code().kind()
    }
}

/// Stable result codes surfaced in responses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    PermissionDenied,
    VolumeNotFound,
    BucketNotFound,
    KeyNotFound,
    InternalError,
}

impl ResultCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::VolumeNotFound => "VOLUME_NOT_FOUND",
            Self::BucketNotFound => "BUCKET_NOT_FOUND",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::PermissionDenied => ErrorKind::AuthorizationDenied,
            Self::VolumeNotFound | Self::BucketNotFound => ErrorKind::NamespaceNotFound,
            Self::KeyNotFound => ErrorKind::KeyNotFound,
            Self::InternalError => ErrorKind::Unexpected,
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse failure classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AuthorizationDenied,
    NamespaceNotFound,
    KeyNotFound,
    Unexpected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let denied = Error::PermissionDenied {
            user: "bob".into(),
            resource_type: ResourceType::Key,
            resource: "/vol1/bucket1/key1".into(),
            acl: AclType::Write,
        };
        assert_eq!(denied.kind(), ErrorKind::AuthorizationDenied);
        assert_eq!(
            Error::VolumeNotFound("vol1".into()).kind(),
            ErrorKind::NamespaceNotFound
        );
        assert_eq!(
            Error::BucketNotFound {
                volume: "vol1".into(),
                bucket: "b".into()
            }
            .kind(),
            ErrorKind::NamespaceNotFound
        );
        assert_eq!(Error::KeyNotFound("k".into()).kind(), ErrorKind::KeyNotFound);
        assert_eq!(Error::store("io").kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn test_result_codes_are_distinct() {
        assert_eq!(
            Error::KeyNotFound("k".into()).result_code().as_str(),
            "KEY_NOT_FOUND"
        );
        assert_eq!(
            Error::VolumeNotFound("v".into()).result_code(),
            ResultCode::VolumeNotFound
        );
        assert_ne!(
            Error::VolumeNotFound("v".into()).result_code(),
            Error::BucketNotFound {
                volume: "v".into(),
                bucket: "b".into()
            }
            .result_code()
        );
    }

    #[test]
    fn test_permission_denied_message() {
        let denied = Error::PermissionDenied {
            user: "bob".into(),
            resource_type: ResourceType::Key,
            resource: "/vol1/bucket1/key1".into(),
            acl: AclType::Write,
        };
        assert_eq!(
            denied.to_string(),
            "user bob does not have WRITE permission on KEY /vol1/bucket1/key1"
        );
    }
}
