//! Context handed to every request while it is applied
//!
//! Holds the store, configuration and the pluggable collaborators
//! (authorizer, audit sink, metrics). Requests never reach for globals.

use crate::acl::{Authorizer, StaticAclAuthorizer};
use crate::audit::{AuditLogger, AuditMessage, TracingAuditLogger};
use crate::metrics::KeyMetrics;
use crate::request::OmRequest;
use crate::response::OmClientResponse;
use objmeta_common::MetaConfig;
use objmeta_store::{MetaStore, StoreResult};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct MetaContext {
    store: Arc<MetaStore>,
    config: MetaConfig,
    authorizer: Arc<dyn Authorizer>,
    audit_logger: Arc<dyn AuditLogger>,
    metrics: Arc<KeyMetrics>,
}

impl MetaContext {
    /// Context with the configured static ACLs and the tracing audit sink
    pub fn new(store: Arc<MetaStore>, config: MetaConfig) -> Self {
        let authorizer = Arc::new(StaticAclAuthorizer::from_config(&config.acl));
        Self {
            store,
            config,
            authorizer,
            audit_logger: Arc::new(TracingAuditLogger),
            metrics: Arc::new(KeyMetrics::new()),
        }
    }

    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    #[must_use]
    pub fn with_audit_logger(mut self, audit_logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = audit_logger;
        self
    }

    pub fn store(&self) -> &MetaStore {
        &self.store
    }

    pub const fn config(&self) -> &MetaConfig {
        &self.config
    }

    pub const fn acls_enabled(&self) -> bool {
        self.config.acls_enabled
    }

    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    pub fn metrics(&self) -> &KeyMetrics {
        &self.metrics
    }

    /// Hand a record to the audit sink. Sink failures are logged and dropped.
    pub fn audit_log(&self, message: &AuditMessage) {
        if let Err(e) = self.audit_logger.log_write(message) {
            warn!("Failed to write audit record {}: {}", message, e);
        }
    }

    /// Apply one log entry at sequence number `index`
    pub fn apply(&self, request: &OmRequest, index: u64) -> OmClientResponse {
        request.validate_and_update_cache(self, index)
    }

    /// Persist applied responses in one write transaction and evict the
    /// cache entries they covered. Returns the number of evicted entries.
    pub fn flush(&self, responses: &[OmClientResponse]) -> StoreResult<usize> {
        let Some(through) = responses.iter().map(OmClientResponse::index).max() else {
            return Ok(0);
        };
        debug!("Flushing {} responses through {}", responses.len(), through);
        self.store.flush(through, |txn| {
            for response in responses {
                response.add_to_db_batch(&self.store, txn)?;
            }
            Ok(())
        })
    }
}
