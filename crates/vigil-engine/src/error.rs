//! Engine layer errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`EngineError::Rbac`] | `ENGINE_RBAC` | Follows the inner fault |
//! | [`EngineError::Consent`] | `ENGINE_CONSENT` | Follows the inner fault |
//!
//! An error from `check_access` means the decision could not be made —
//! typically an unavailable store during a required read. Callers must
//! treat this as "not allowed right now" (fail closed), distinct from a
//! deny decision which is a definitive answer.

use thiserror::Error;
use vigil_consent::ConsentError;
use vigil_rbac::RbacError;
use vigil_types::ErrorCode;

/// Engine layer error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Permission resolution failed.
    #[error("permission resolution failed: {0}")]
    Rbac(#[from] RbacError),

    /// Consent resolution failed.
    #[error("consent resolution failed: {0}")]
    Consent(#[from] ConsentError),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rbac(_) => "ENGINE_RBAC",
            Self::Consent(_) => "ENGINE_CONSENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Rbac(e) => e.is_recoverable(),
            Self::Consent(e) => e.is_recoverable(),
        }
    }
}
