//! Access decision engine for the vigil compliance core.
//!
//! Composes the permission catalog, consent store, audit pipeline and
//! violation escalator into one entry point:
//!
//! ```text
//! check_access(user, permission, patient context)
//!     │
//!     ├── PermissionCatalog.has_permission ── deny? ──► violation + audit
//!     ├── emergency override? ── requires emergency_access/break_glass
//!     ├── ConsentStore.find_applicable_consent ── none? ──► violation + audit
//!     ├── ConsentStore.verify_scope ── invalid? ──► violation + audit
//!     └── allow decision (risk level, audit flag) ──► audit
//! ```
//!
//! Every call produces exactly one audit event. Denials are decisions,
//! not errors; only an unanswerable question (store fault during a
//! read) is an error, and it fails closed. Audit and violation write
//! failures never surface here.

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;

pub use config::{AuditSettings, ConsentSettings, CoreConfig};
pub use decision::{AccessDecision, AccessOutcome, PatientContext};
pub use engine::AccessDecisionEngine;
pub use error::EngineError;
