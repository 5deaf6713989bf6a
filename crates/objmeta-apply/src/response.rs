//! Responses returned by the apply path
//!
//! [`OmResponse`] is what the client eventually sees. The per-request
//! response types wrap it together with whatever the flusher needs to make
//! the change durable.

use objmeta_common::{Error, ErrorKind, KeyInfo, ResultCode};
use objmeta_store::{MetaStore, StoreResult};
use redb::WriteTransaction;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CmdType {
    CommitKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    #[serde(untagged)]
    Error(ResultCode),
}

/// Empty acknowledgment body of a successful commit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommitKeyAck {}

/// Client-facing response envelope
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OmResponse {
    pub cmd_type: CmdType,
    pub status: Status,
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_key_response: Option<CommitKeyAck>,
}

impl OmResponse {
    pub const fn ok(cmd_type: CmdType) -> Self {
        Self {
            cmd_type,
            status: Status::Ok,
            success: true,
            message: String::new(),
            commit_key_response: None,
        }
    }

    pub fn error(cmd_type: CmdType, err: &Error) -> Self {
        Self {
            cmd_type,
            status: Status::Error(err.result_code()),
            success: false,
            message: err.to_string(),
            commit_key_response: None,
        }
    }

    #[must_use]
    pub fn with_commit_key_response(mut self, ack: CommitKeyAck) -> Self {
        self.commit_key_response = Some(ack);
        self
    }
}

/// What happened to one log entry
#[derive(Debug, PartialEq, Eq)]
pub enum CommitOutcome<'a> {
    Applied {
        index: u64,
        key_info: &'a KeyInfo,
    },
    Rejected {
        index: u64,
        kind: ErrorKind,
        code: ResultCode,
        message: &'a str,
    },
}

/// Result of applying a commit-key request
#[derive(Clone, Debug)]
pub struct KeyCommitResponse {
    index: u64,
    /// Set only when the commit was applied
    committed: Option<(KeyInfo, u64)>,
    om_response: OmResponse,
}

impl KeyCommitResponse {
    pub const fn applied(
        index: u64,
        key_info: KeyInfo,
        client_id: u64,
        om_response: OmResponse,
    ) -> Self {
        Self {
            index,
            committed: Some((key_info, client_id)),
            om_response,
        }
    }

    pub const fn rejected(index: u64, om_response: OmResponse) -> Self {
        Self {
            index,
            committed: None,
            om_response,
        }
    }

    pub const fn index(&self) -> u64 {
        self.index
    }

    pub fn key_info(&self) -> Option<&KeyInfo> {
        self.committed.as_ref().map(|(info, _)| info)
    }

    pub const fn om_response(&self) -> &OmResponse {
        &self.om_response
    }

    pub fn outcome(&self) -> CommitOutcome<'_> {
        match (&self.committed, self.om_response.status) {
            (Some((key_info, _)), _) => CommitOutcome::Applied {
                index: self.index,
                key_info,
            },
            (None, status) => {
                let code = match status {
                    Status::Error(code) => code,
                    Status::Ok => ResultCode::InternalError,
                };
                CommitOutcome::Rejected {
                    index: self.index,
                    kind: code.kind(),
                    code,
                    message: &self.om_response.message,
                }
            }
        }
    }

    /// Stage the durable form of this commit: drop the open-key row, write
    /// the key row. A rejected commit stages nothing.
    pub fn add_to_db_batch(&self, store: &MetaStore, txn: &WriteTransaction) -> StoreResult<()> {
        let Some((key_info, client_id)) = &self.committed else {
            return Ok(());
        };
        let open_key = MetaStore::open_key(
            &key_info.volume_name,
            &key_info.bucket_name,
            &key_info.key_name,
            *client_id,
        );
        let ozone_key = MetaStore::ozone_key(
            &key_info.volume_name,
            &key_info.bucket_name,
            &key_info.key_name,
        );
        store.open_key_table().delete_with_batch(txn, &open_key)?;
        store.key_table().put_with_batch(txn, &ozone_key, key_info)
    }
}

/// Response of any applied request
#[derive(Clone, Debug)]
pub enum OmClientResponse {
    CommitKey(KeyCommitResponse),
}

impl OmClientResponse {
    pub const fn index(&self) -> u64 {
        match self {
            Self::CommitKey(r) => r.index(),
        }
    }

    pub const fn om_response(&self) -> &OmResponse {
        match self {
            Self::CommitKey(r) => r.om_response(),
        }
    }

    pub fn add_to_db_batch(&self, store: &MetaStore, txn: &WriteTransaction) -> StoreResult<()> {
        match self {
            Self::CommitKey(r) => r.add_to_db_batch(store, txn),
        }
    }
}

impl From<KeyCommitResponse> for OmClientResponse {
    fn from(response: KeyCommitResponse) -> Self {
        Self::CommitKey(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_info() -> KeyInfo {
        KeyInfo {
            volume_name: "vol1".into(),
            bucket_name: "bucket1".into(),
            key_name: "key1".into(),
            data_size: 10,
            key_locations: Vec::new(),
            creation_time: 1,
            modification_time: 2,
            owner: "alice".into(),
        }
    }

    #[test]
    fn test_applied_outcome() {
        let response = KeyCommitResponse::applied(
            9,
            key_info(),
            7,
            OmResponse::ok(CmdType::CommitKey).with_commit_key_response(CommitKeyAck {}),
        );
        assert!(response.om_response().success);
        assert_eq!(
            response.outcome(),
            CommitOutcome::Applied {
                index: 9,
                key_info: &key_info()
            }
        );
    }

    #[test]
    fn test_rejected_outcome() {
        let err = Error::KeyNotFound("no open key".into());
        let response = KeyCommitResponse::rejected(3, OmResponse::error(CmdType::CommitKey, &err));
        assert!(response.key_info().is_none());
        assert_eq!(
            response.outcome(),
            CommitOutcome::Rejected {
                index: 3,
                kind: ErrorKind::KeyNotFound,
                code: ResultCode::KeyNotFound,
                message: "no open key",
            }
        );
    }

    #[test]
    fn test_om_response_json() {
        let ok = OmResponse::ok(CmdType::CommitKey).with_commit_key_response(CommitKeyAck {});
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"cmd_type":"CommitKey","status":"OK","success":true,"commit_key_response":{}}"#
        );

        let err = OmResponse::error(CmdType::CommitKey, &Error::VolumeNotFound("v".into()));
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"cmd_type":"CommitKey","status":"VOLUME_NOT_FOUND","success":false,"message":"volume not found: v"}"#
        );
    }
}
