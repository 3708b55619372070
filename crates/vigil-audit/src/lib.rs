//! Audit trail and violation escalation for the vigil core.
//!
//! Two components share this crate because they share a discipline:
//! neither is ever allowed to block or fail the primary access path.
//!
//! ```text
//! AccessDecisionEngine
//!     │ enqueue(event)                 │ record(violation)
//!     ▼                               ▼
//! AuditPipeline                   ViolationEscalator
//!     │ gate → queue → batch          │ persist → alert (high/critical)
//!     ▼                               ▼
//! audit_log                       compliance_violations
//! ```
//!
//! # Degraded mode
//!
//! The pipeline's durability policy is explicit:
//! [`AuditDurability::BestEffort`] discards a failed batch instead of
//! retrying, trading audit completeness for availability of the primary
//! path. Every drop and discard is counted, never silent to operators.
//!
//! # Gating
//!
//! Events are gated at enqueue time: the principal must be
//! authenticated, and email-unverified principals only produce entries
//! for critical actions. Gated-out events are dropped by design — the
//! per-reason counters on [`AuditPipeline`] make the drops observable.

pub mod entry;
pub mod error;
pub mod pipeline;
pub mod testing;
pub mod violation;

pub use entry::{ActionResult, ActionType, AuditActor, AuditEvent, AuditLogEntry};
pub use error::AuditError;
pub use pipeline::{AuditDurability, AuditPipeline, EnqueueOutcome};
pub use violation::{AlertChannel, ComplianceViolation, LoggingAlertChannel, ViolationEscalator, ViolationType};
