//! Authorization
//!
//! The apply path asks an [`Authorizer`] whether the caller holds an ACL
//! right on a namespace object. Policy languages live elsewhere; this module
//! only defines the seam plus a few simple evaluators.

use objmeta_common::{AclConfig, AclGrant, AclType, ResourceType, Result, UserInfo};
use std::collections::HashSet;

/// Namespace object an ACL check targets
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    pub resource_type: ResourceType,
    pub volume: String,
    pub bucket: Option<String>,
    pub key: Option<String>,
}

impl ObjectRef {
    pub fn key(
        volume: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: ResourceType::Key,
            volume: volume.into(),
            bucket: Some(bucket.into()),
            key: Some(key.into()),
        }
    }

    /// Path form, e.g. `/vol1/bucket1/key1`
    pub fn path(&self) -> String {
        let mut path = format!("/{}", self.volume);
        for part in [&self.bucket, &self.key].into_iter().flatten() {
            path.push('/');
            path.push_str(part);
        }
        path
    }
}

/// Who is asking, and for what
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user: UserInfo,
    pub acl: AclType,
}

impl RequestContext {
    pub const fn new(user: UserInfo, acl: AclType) -> Self {
        Self { user, acl }
    }
}

/// Access-control evaluator
pub trait Authorizer: Send + Sync {
    /// Evaluator name for logs
    fn name(&self) -> &str;

    /// `Ok(true)` grants access, `Ok(false)` denies it. `Err` means the
    /// evaluator itself failed.
    fn check_access(&self, object: &ObjectRef, context: &RequestContext) -> Result<bool>;
}

/// Allows everything
pub struct AllowAllAuthorizer;

impl Authorizer for AllowAllAuthorizer {
    fn name(&self) -> &str {
        "allow-all"
    }

    fn check_access(&self, _object: &ObjectRef, _context: &RequestContext) -> Result<bool> {
        Ok(true)
    }
}

/// Denies everything
pub struct DenyAllAuthorizer;

impl Authorizer for DenyAllAuthorizer {
    fn name(&self) -> &str {
        "deny-all"
    }

    fn check_access(&self, _object: &ObjectRef, _context: &RequestContext) -> Result<bool> {
        Ok(false)
    }
}

/// Evaluates a fixed list of grants from configuration
pub struct StaticAclAuthorizer {
    admins: HashSet<String>,
    grants: Vec<AclGrant>,
}

impl StaticAclAuthorizer {
    pub fn from_config(config: &AclConfig) -> Self {
        Self {
            admins: config.admins.iter().cloned().collect(),
            grants: config.grants.clone(),
        }
    }

    fn grant_covers(grant: &AclGrant, object: &ObjectRef) -> bool {
        if grant.volume != object.volume {
            return false;
        }
        if let Some(bucket) = &grant.bucket
            && object.bucket.as_ref() != Some(bucket)
        {
            return false;
        }
        match (&grant.key, &object.key) {
            (None, _) => true,
            (Some(pattern), Some(key)) => match pattern.strip_suffix('*') {
                Some(prefix) => key.starts_with(prefix),
                None => pattern == key,
            },
            // Key-scoped grant never covers a bucket or volume
            (Some(_), None) => false,
        }
    }
}

impl Authorizer for StaticAclAuthorizer {
    fn name(&self) -> &str {
        "static-acl"
    }

    fn check_access(&self, object: &ObjectRef, context: &RequestContext) -> Result<bool> {
        let user = &context.user.user_name;
        if self.admins.contains(user) {
            return Ok(true);
        }
        Ok(self.grants.iter().any(|grant| {
            (grant.user == *user || grant.user == "*")
                && Self::grant_covers(grant, object)
                && grant.acls.iter().any(|held| held.grants(context.acl))
        }))
    }
}
