//! Audit layer errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`AuditError::Store`] | `AUDIT_STORE` | Follows the store fault |
//! | [`AuditError::Alert`] | `AUDIT_ALERT` | Yes |
//!
//! These errors stay inside this crate's machinery: the pipeline and
//! escalator log and swallow them rather than surfacing them to the
//! caller of the primary access path.

use thiserror::Error;
use vigil_store::StoreError;
use vigil_types::ErrorCode;

/// Audit layer error.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Batch or violation persistence failed.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    /// The alert channel rejected or failed a notification.
    #[error("alert delivery failed: {0}")]
    Alert(String),
}

impl ErrorCode for AuditError {
    fn code(&self) -> &'static str {
        match self {
            Self::Store(_) => "AUDIT_STORE",
            Self::Alert(_) => "AUDIT_ALERT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_recoverable(),
            Self::Alert(_) => true,
        }
    }
}
