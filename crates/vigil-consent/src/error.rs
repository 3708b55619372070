//! Consent layer errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`ConsentError::NotFound`] | `CONSENT_NOT_FOUND` | No |
//! | [`ConsentError::AlreadyRevoked`] | `CONSENT_ALREADY_REVOKED` | No |
//! | [`ConsentError::Store`] | `CONSENT_STORE` | Follows the store fault |
//!
//! "No applicable consent" is not an error — `find_applicable_consent`
//! returns `Ok(None)` and the caller denies. Errors here mean the
//! question could not be answered at all.

use thiserror::Error;
use vigil_store::StoreError;
use vigil_types::{ConsentId, ErrorCode};

/// Consent layer error.
#[derive(Debug, Error)]
pub enum ConsentError {
    /// A specifically-addressed consent record does not exist.
    #[error("consent not found: {0}")]
    NotFound(ConsentId),

    /// The consent was already revoked (terminal state).
    #[error("consent already revoked: {0}")]
    AlreadyRevoked(ConsentId),

    /// A store operation failed; the original fault is preserved.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for ConsentError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "CONSENT_NOT_FOUND",
            Self::AlreadyRevoked(_) => "CONSENT_ALREADY_REVOKED",
            Self::Store(_) => "CONSENT_STORE",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::AlreadyRevoked(_) => false,
            Self::Store(e) => e.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::assert_error_codes;

    fn all_variants() -> Vec<ConsentError> {
        vec![
            ConsentError::NotFound(ConsentId::new("c-1")),
            ConsentError::AlreadyRevoked(ConsentId::new("c-2")),
            ConsentError::Store(StoreError::unavailable("down")),
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "CONSENT_");
    }

    #[test]
    fn store_recoverability_passes_through() {
        assert!(ConsentError::Store(StoreError::unavailable("down")).is_recoverable());
        assert!(!ConsentError::NotFound(ConsentId::new("c-1")).is_recoverable());
    }
}
