//! objmeta Common - Shared types and utilities
//!
//! This crate provides the namespace types, error definitions, and
//! configuration used across all objmeta components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AclConfig, AclGrant, MetaConfig};
pub use error::{Error, ErrorKind, Result, ResultCode};
pub use types::*;
