//! Patient consent resolution for the vigil core.
//!
//! Answers one question for the decision engine: *which consent, if
//! any, authorizes this request?* — and shapes the verification result
//! (risk level, audit flag) that the decision carries.
//!
//! ```text
//! ConsentStore
//!     │  find_applicable_consent(patient, request)
//!     │      1. fetch newest granted consents (≤ fetch limit)
//!     │      2. drop expired (derived check, not a stored flag)
//!     │      3. emergency > treatment > newest-first
//!     │      4. first whose scope covers the request
//!     │
//!     │  verify_scope(consent, request)   → risk + audit flag
//!     │  handle_emergency_access(request) → critical, always audited
//!     │
//!     └── per-patient cache, short TTL, evicted on revoke
//! ```
//!
//! # Scope coverage
//!
//! For each of facility/provider/service: a requested value must be a
//! member of the consent's corresponding set, unless that set is empty
//! (empty = unrestricted). Every requested data category must appear in
//! the consent's category list.
//!
//! # Emergency access
//!
//! [`ConsentStore::handle_emergency_access`] only shapes the record
//! (critical risk, forced audit). It does *not* authorize anything —
//! the engine must first confirm the principal holds an
//! emergency-access permission through the RBAC catalog.

pub mod cipher;
pub mod consent;
pub mod error;
pub mod request;
pub mod store;
pub mod verify;

pub use cipher::{CipherError, RecordCipher};
pub use consent::{ConsentScope, ConsentStatus, ConsentType, DataCategory, PatientConsent};
pub use error::ConsentError;
pub use request::AccessRequest;
pub use store::ConsentStore;
pub use verify::VerificationResult;
