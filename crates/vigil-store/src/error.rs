//! Store layer errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`StoreError::NotFound`] | `STORE_NOT_FOUND` | No |
//! | [`StoreError::Unavailable`] | `STORE_UNAVAILABLE` | Yes |
//! | [`StoreError::PermissionDenied`] | `STORE_PERMISSION_DENIED` | No |
//! | [`StoreError::InvalidQuery`] | `STORE_INVALID_QUERY` | No |
//! | [`StoreError::Serialization`] | `STORE_SERIALIZATION` | No |
//!
//! `Unavailable` is the only transient condition; everything else is a
//! caller bug or a definitive answer from the backend.

use thiserror::Error;
use vigil_types::ErrorCode;

/// Document store error.
///
/// The critical distinction: [`NotFound`](Self::NotFound) means the
/// backend answered "that document does not exist";
/// [`Unavailable`](Self::Unavailable) means the backend did not answer.
/// Access decisions fail closed on the latter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A specifically-addressed document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection the lookup targeted.
        collection: String,
        /// Document id that was absent.
        id: String,
    },

    /// The backend call failed (network fault, timeout, outage).
    ///
    /// Retry may succeed. Never interpret as "no matching records".
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the operation (store-level rules, not RBAC).
    #[error("store permission denied: {0}")]
    PermissionDenied(String),

    /// The query is malformed (unknown field, unsupported operator).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A document could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a `NotFound` error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates an `Unavailable` error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Returns `true` if the backend definitively answered "absent".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "STORE_NOT_FOUND",
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::PermissionDenied(_) => "STORE_PERMISSION_DENIED",
            Self::InvalidQuery(_) => "STORE_INVALID_QUERY",
            Self::Serialization(_) => "STORE_SERIALIZATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
