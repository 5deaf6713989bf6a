//! Commit of a key opened earlier by the same client session
//!
//! Turns the open-key row `/{vol}/{bucket}/{key}/{clientId}` into the
//! committed row `/{vol}/{bucket}/{key}` with the final size and block list.

use super::{ClientRequest, check_key_acl, validate_bucket_and_volume};
use crate::audit::{AuditAction, AuditMessage, build_key_args_audit_map};
use crate::context::MetaContext;
use crate::response::{
    CmdType, CommitKeyAck, KeyCommitResponse, OmClientResponse, OmResponse,
};
use objmeta_common::{AclType, Error, KeyArgs, KeyInfo, Result, UserInfo};
use objmeta_store::{CacheBatch, MetaStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCommitRequest {
    pub key_args: KeyArgs,
    /// Session id handed out when the key was opened
    pub client_id: u64,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

impl KeyCommitRequest {
    pub const fn new(key_args: KeyArgs, client_id: u64) -> Self {
        Self {
            key_args,
            client_id,
            user_info: None,
        }
    }

    fn check_acls(&self, ctx: &MetaContext) -> Result<()> {
        if !ctx.acls_enabled() {
            return Ok(());
        }
        let args = &self.key_args;
        let user = self.user_info.clone().unwrap_or_default();
        check_key_acl(
            ctx,
            &user,
            &args.volume_name,
            &args.bucket_name,
            &args.key_name,
            AclType::Write,
        )
    }

    /// Caller holds the bucket lock. Nothing is mutated unless every check
    /// passes.
    fn commit_locked(&self, ctx: &MetaContext, index: u64) -> Result<KeyInfo> {
        let store = ctx.store();
        let args = &self.key_args;
        validate_bucket_and_volume(store, &args.volume_name, &args.bucket_name)?;

        let db_open_key = MetaStore::open_key(
            &args.volume_name,
            &args.bucket_name,
            &args.key_name,
            self.client_id,
        );
        let mut key_info = store.open_key_table().get(&db_open_key)?.ok_or_else(|| {
            Error::KeyNotFound(format!(
                "Failed to commit key, as {db_open_key} entry is not found in the open key table"
            ))
        })?;

        key_info.data_size = args.data_size;
        // Unstamped requests keep the open entry's time so replicas agree
        if let Some(modification_time) = args.modification_time {
            key_info.modification_time = modification_time;
        }
        key_info.update_location_info_list(args.key_locations.clone());

        let db_ozone_key =
            MetaStore::ozone_key(&args.volume_name, &args.bucket_name, &args.key_name);
        debug!(
            "Committing {} -> {} at index {}",
            db_open_key, db_ozone_key, index
        );
        store.apply_cache_batch(
            CacheBatch::new(index)
                .delete_open_key(db_open_key)
                .put_key(db_ozone_key, key_info.clone()),
        );
        Ok(key_info)
    }
}

impl ClientRequest for KeyCommitRequest {
    fn pre_execute(mut self, caller: &UserInfo, now_millis: u64) -> Self {
        if self.key_args.modification_time.is_none() {
            self.key_args.modification_time = Some(now_millis);
        }
        self.user_info = Some(caller.clone());
        self
    }

    fn validate_and_update_cache(&self, ctx: &MetaContext, index: u64) -> OmClientResponse {
        let args = &self.key_args;
        ctx.metrics().inc_num_key_commits();
        let audit_map = build_key_args_audit_map(args);

        let result = self.check_acls(ctx).and_then(|()| {
            let _guard = ctx
                .store()
                .lock()
                .acquire_bucket_lock(&args.volume_name, &args.bucket_name);
            self.commit_locked(ctx, index)
        });

        ctx.audit_log(&AuditMessage::new(
            AuditAction::CommitKey,
            audit_map,
            result.as_ref().err(),
            self.user_info.as_ref(),
        ));

        match result {
            Ok(key_info) => {
                info!(
                    "Key committed. Volume:{}, Bucket:{}, Key:{}",
                    args.volume_name, args.bucket_name, args.key_name
                );
                KeyCommitResponse::applied(
                    index,
                    key_info,
                    self.client_id,
                    OmResponse::ok(CmdType::CommitKey).with_commit_key_response(CommitKeyAck {}),
                )
                .into()
            }
            Err(e) => {
                error!(
                    "Key commit failed. Volume:{}, Bucket:{}, Key:{}. Exception:{}",
                    args.volume_name, args.bucket_name, args.key_name, e
                );
                ctx.metrics().inc_num_key_commit_fails();
                KeyCommitResponse::rejected(index, OmResponse::error(CmdType::CommitKey, &e))
                    .into()
            }
        }
    }
}
