//! RBAC layer errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`RbacError::InvalidRole`] | `RBAC_INVALID_ROLE` | No |
//! | [`RbacError::UnknownPermission`] | `RBAC_UNKNOWN_PERMISSION` | No |
//! | [`RbacError::NotLoaded`] | `RBAC_NOT_LOADED` | No |
//! | [`RbacError::Store`] | `RBAC_STORE` | Follows the store fault |
//! | [`RbacError::Serialization`] | `RBAC_SERIALIZATION` | No |
//!
//! A *denied* permission check is not an error — callers receive a
//! [`PermissionCheck::Denied`](crate::PermissionCheck::Denied) value and
//! branch on it.

use thiserror::Error;
use vigil_store::StoreError;
use vigil_types::{ErrorCode, PermissionId, RoleId};

/// RBAC layer error.
#[derive(Debug, Error)]
pub enum RbacError {
    /// The referenced role does not exist or is deactivated.
    #[error("invalid or inactive role: {0}")]
    InvalidRole(RoleId),

    /// The referenced permission id is not in the catalog.
    #[error("unknown permission: {0}")]
    UnknownPermission(PermissionId),

    /// The catalog has not been loaded or bootstrapped yet.
    #[error("permission catalog not loaded")]
    NotLoaded,

    /// A store operation failed; the original fault is preserved.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    /// A catalog document could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ErrorCode for RbacError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRole(_) => "RBAC_INVALID_ROLE",
            Self::UnknownPermission(_) => "RBAC_UNKNOWN_PERMISSION",
            Self::NotLoaded => "RBAC_NOT_LOADED",
            Self::Store(_) => "RBAC_STORE",
            Self::Serialization(_) => "RBAC_SERIALIZATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidRole(_)
            | Self::UnknownPermission(_)
            | Self::NotLoaded
            | Self::Serialization(_) => false,
            Self::Store(e) => e.is_recoverable(),
        }
    }
}
