//! Access decisions.
//!
//! An [`AccessDecision`] is ephemeral: it is returned to the caller and
//! embedded into audit/violation records, never persisted as its own
//! entity. The `justification` string is user-visible — it carries a
//! human-readable reason and never internal error detail.

use serde::{Deserialize, Serialize};
use vigil_consent::AccessRequest;
use vigil_types::{ConsentId, CorrelationId, PermissionId, RiskLevel, UserId};

/// Allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessOutcome {
    /// Access is permitted.
    Allow,
    /// Access is refused.
    Deny,
}

/// The patient-scoped part of an access check.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientContext {
    /// What the actor wants to touch.
    pub request: AccessRequest,
    /// Requests the emergency bypass of consent matching; only honored
    /// for principals holding an emergency-access permission.
    pub emergency_override: bool,
}

impl PatientContext {
    /// Creates a normal (non-emergency) context.
    #[must_use]
    pub fn new(request: AccessRequest) -> Self {
        Self {
            request,
            emergency_override: false,
        }
    }

    /// Creates an emergency-override context.
    #[must_use]
    pub fn emergency(request: AccessRequest) -> Self {
        Self {
            request,
            emergency_override: true,
        }
    }
}

/// The outcome of one access check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    /// The requesting principal.
    pub principal: UserId,
    /// The permission that was checked.
    pub permission: PermissionId,
    /// The consent that authorized the access, when one did.
    pub consent_id: Option<ConsentId>,
    /// Risk classification of the access.
    pub risk_level: RiskLevel,
    /// Whether this access must be audited.
    pub audit_required: bool,
    /// Allow or deny.
    pub outcome: AccessOutcome,
    /// Human-readable reason; safe to show to the user.
    pub justification: String,
    /// Correlates the decision with its audit/violation records.
    pub correlation_id: CorrelationId,
}

impl AccessDecision {
    /// Returns `true` if access was allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.outcome == AccessOutcome::Allow
    }
}

impl std::fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = match self.outcome {
            AccessOutcome::Allow => "allow",
            AccessOutcome::Deny => "deny",
        };
        write!(
            f,
            "{} {} for {} ({} risk): {}",
            outcome, self.permission, self.principal, self.risk_level, self.justification
        )
    }
}
