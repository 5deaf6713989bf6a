//! objmeta Apply - log-apply path for namespace write requests
//!
//! This crate provides:
//! - Request types with leader-side pre-processing and replica-side apply
//! - The key commit operation (open key -> committed key)
//! - Client responses and their durable write batches
//! - Authorization, audit and metrics seams used while applying

pub mod acl;
pub mod audit;
pub mod context;
pub mod metrics;
pub mod request;
pub mod response;

pub use acl::{
    AllowAllAuthorizer, Authorizer, DenyAllAuthorizer, ObjectRef, RequestContext,
    StaticAclAuthorizer,
};
pub use audit::{AuditAction, AuditError, AuditLogger, AuditMessage, AuditResult, TracingAuditLogger};
pub use context::MetaContext;
pub use metrics::KeyMetrics;
pub use request::{ClientRequest, KeyCommitRequest, OmRequest};
pub use response::{
    CmdType, CommitKeyAck, CommitOutcome, KeyCommitResponse, OmClientResponse, OmResponse, Status,
};
