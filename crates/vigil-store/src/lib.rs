//! Document store collaborator for the vigil core.
//!
//! The surrounding system owns the actual database; this core only sees
//! key-value documents addressed by collection + id, queryable by
//! equality/range predicates, with atomic batched writes. [`DocumentStore`]
//! is that boundary, and [`MemoryStore`] is the in-process implementation
//! the test suites run against.
//!
//! # Collections
//!
//! Logical collection names consumed/produced by this core live in
//! [`collections`] so no layer spells them ad hoc.
//!
//! # Failing closed
//!
//! [`StoreError`] keeps "the document does not exist" ([`StoreError::NotFound`])
//! strictly apart from "the backend call failed"
//! ([`StoreError::Unavailable`]). Decision paths must propagate the
//! latter — an unavailable store is never evidence that no consent or
//! role exists.

pub mod error;
pub mod memory;
pub mod query;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{Direction, Filter, FilterOp, Query};
pub use store::{BatchWrite, DocumentStore};

/// Logical collection names used by this core.
pub mod collections {
    /// Permission definitions.
    pub const PERMISSIONS: &str = "permissions";
    /// Role definitions.
    pub const ROLES: &str = "roles";
    /// User-to-role assignments (compound id `{user}_{role}`).
    pub const USER_ROLES: &str = "user_roles";
    /// Patient consent records.
    pub const PATIENT_CONSENTS: &str = "patient_consents";
    /// Append-only audit log.
    pub const AUDIT_LOG: &str = "audit_log";
    /// Compliance violations pending review.
    pub const COMPLIANCE_VIOLATIONS: &str = "compliance_violations";
}
