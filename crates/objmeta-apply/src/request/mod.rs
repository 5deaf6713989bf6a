//! Write requests applied from the replicated log
//!
//! Each request goes through two steps. [`ClientRequest::pre_execute`] runs
//! once on the leader before the request is logged and may read the clock.
//! [`ClientRequest::validate_and_update_cache`] runs on every replica in log
//! order and must be deterministic.

mod key_commit;

pub use key_commit::KeyCommitRequest;

use crate::acl::{ObjectRef, RequestContext};
use crate::context::MetaContext;
use crate::response::OmClientResponse;
use objmeta_common::{AclType, Error, Result, UserInfo};
use objmeta_store::MetaStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub trait ClientRequest {
    /// Stamp leader-side fields (caller, times). Idempotent.
    #[must_use]
    fn pre_execute(self, caller: &UserInfo, now_millis: u64) -> Self;

    /// Validate against the current namespace and land the change in the
    /// table caches at epoch `index`
    fn validate_and_update_cache(&self, ctx: &MetaContext, index: u64) -> OmClientResponse;
}

/// Any request that can appear in the log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OmRequest {
    CommitKey(KeyCommitRequest),
}

impl OmRequest {
    #[must_use]
    pub fn pre_execute(self, caller: &UserInfo, now_millis: u64) -> Self {
        match self {
            Self::CommitKey(r) => Self::CommitKey(r.pre_execute(caller, now_millis)),
        }
    }

    pub fn validate_and_update_cache(&self, ctx: &MetaContext, index: u64) -> OmClientResponse {
        match self {
            Self::CommitKey(r) => r.validate_and_update_cache(ctx, index),
        }
    }
}

impl From<KeyCommitRequest> for OmRequest {
    fn from(request: KeyCommitRequest) -> Self {
        Self::CommitKey(request)
    }
}

/// Fail with `PermissionDenied` unless the caller holds `acl` on the key
pub(crate) fn check_key_acl(
    ctx: &MetaContext,
    user: &UserInfo,
    volume: &str,
    bucket: &str,
    key: &str,
    acl: AclType,
) -> Result<()> {
    let object = ObjectRef::key(volume, bucket, key);
    let context = RequestContext::new(user.clone(), acl);
    let authorizer = ctx.authorizer();
    if authorizer.check_access(&object, &context)? {
        return Ok(());
    }
    debug!(
        "{} denied {} on {} to {}",
        authorizer.name(),
        acl,
        object.path(),
        user.user_name
    );
    Err(Error::PermissionDenied {
        user: user.user_name.clone(),
        resource_type: object.resource_type,
        resource: object.path(),
        acl,
    })
}

/// Volume, then bucket. Caller holds the bucket lock.
pub(crate) fn validate_bucket_and_volume(
    store: &MetaStore,
    volume: &str,
    bucket: &str,
) -> Result<()> {
    if !store.volume_table().is_exist(&MetaStore::volume_key(volume))? {
        return Err(Error::VolumeNotFound(volume.to_string()));
    }
    if !store
        .bucket_table()
        .is_exist(&MetaStore::bucket_key(volume, bucket))?
    {
        return Err(Error::BucketNotFound {
            volume: volume.to_string(),
            bucket: bucket.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::Fixture;
    use objmeta_common::{ErrorKind, MetaConfig};

    #[test]
    fn test_log_entry_json() {
        let request: OmRequest = serde_json::from_str(
            r#"{"type": "CommitKey", "client_id": 100, "key_args": {
                "volume_name": "vol1", "bucket_name": "bucket1", "key_name": "key1",
                "data_size": 1024, "key_locations": [
                    {"block_id": {"container_id": 1, "local_id": 2}, "offset": 0, "length": 1024}
                ]}}"#,
        )
        .unwrap();
        let OmRequest::CommitKey(commit) = &request;
        assert_eq!(commit.client_id, 100);
        assert_eq!(commit.key_args.key_locations.len(), 1);
        assert_eq!(commit.user_info, None);

        let stamped = request.pre_execute(&UserInfo::new("alice"), 7);
        let OmRequest::CommitKey(commit) = &stamped;
        assert_eq!(commit.key_args.modification_time, Some(7));
    }

    #[test]
    fn test_validate_bucket_and_volume() {
        let fixture = Fixture::new();
        let store = &fixture.store;
        assert!(validate_bucket_and_volume(store, "vol1", "bucket1").is_ok());
        let err = validate_bucket_and_volume(store, "vol1", "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NamespaceNotFound);
        let err = validate_bucket_and_volume(store, "nope", "nope").unwrap_err();
        assert!(matches!(err, Error::VolumeNotFound(_)));
    }

    #[test]
    fn test_context_apply_dispatches() {
        let fixture = Fixture::new();
        let ctx = fixture.context(MetaConfig::default());
        let request = OmRequest::from(crate::test_util::commit_request(
            "bucket1",
            "key1",
            100,
            10,
            Vec::new(),
        ));
        let response = ctx.apply(&request, 4);
        assert_eq!(response.index(), 4);
        assert!(response.om_response().success);
    }
}
