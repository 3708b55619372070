//! Compliance violations and escalation.
//!
//! A violation is created once when an access decision denies (or a
//! scope check fails) and mutated only by the review workflow, which
//! lives outside this core. [`ViolationEscalator::record`] is
//! deliberately infallible toward its caller: a violation-reporting
//! failure must never block the primary access decision.

use crate::AuditError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use vigil_store::{collections, DocumentStore};
use vigil_types::{PatientId, Severity, UserId, ViolationId};

/// Classification of a compliance violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Access attempted without any authorizing consent or permission.
    UnauthorizedAccess,
    /// The only matching consent had expired.
    ConsentExpired,
    /// A consent existed but its scope did not cover the request.
    ScopeViolation,
    /// The access purpose did not match the consent purpose
    /// (includes unauthorized emergency-override attempts).
    PurposeViolation,
}

/// One recorded compliance violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceViolation {
    /// Violation id.
    pub id: ViolationId,
    /// Classification.
    pub violation_type: ViolationType,
    /// How serious; high/critical trigger alerting.
    pub severity: Severity,
    /// Human-readable description (no internal error detail).
    pub description: String,
    /// The affected data subject, when the request named one.
    #[serde(default)]
    pub patient_id: Option<PatientId>,
    /// The actor whose access violated.
    pub actor_id: UserId,
    /// When the violation was recorded.
    pub timestamp: DateTime<Utc>,
    /// Set by the review workflow, never by this core.
    pub reviewed: bool,
}

impl ComplianceViolation {
    /// Creates an unreviewed violation timestamped now.
    #[must_use]
    pub fn new(
        violation_type: ViolationType,
        severity: Severity,
        description: impl Into<String>,
        actor_id: UserId,
        patient_id: Option<PatientId>,
    ) -> Self {
        Self {
            id: ViolationId::new(),
            violation_type,
            severity,
            description: description.into(),
            patient_id,
            actor_id,
            timestamp: Utc::now(),
            reviewed: false,
        }
    }
}

/// Notification collaborator for high/critical violations.
///
/// The channel itself (pager, mail, ticket) is outside this core; this
/// trait only defines the trigger.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Delivers one alert.
    async fn send_alert(&self, violation: &ComplianceViolation) -> Result<(), AuditError>;
}

/// Default alert channel: emits a structured error log.
#[derive(Debug, Default)]
pub struct LoggingAlertChannel;

#[async_trait]
impl AlertChannel for LoggingAlertChannel {
    async fn send_alert(&self, violation: &ComplianceViolation) -> Result<(), AuditError> {
        error!(
            violation = %violation.id,
            severity = %violation.severity,
            actor = %violation.actor_id,
            "compliance violation alert: {}",
            violation.description
        );
        Ok(())
    }
}

/// Persists violations and triggers alerting for severe ones.
pub struct ViolationEscalator {
    store: Arc<dyn DocumentStore>,
    alerts: Arc<dyn AlertChannel>,
}

impl ViolationEscalator {
    /// Creates an escalator over the given store and alert channel.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, alerts: Arc<dyn AlertChannel>) -> Self {
        Self { store, alerts }
    }

    /// Persists the violation, then alerts when severity is high or
    /// critical.
    ///
    /// Never fails toward the caller: persistence and alert faults are
    /// logged and swallowed so violation reporting cannot block the
    /// access decision that produced it.
    pub async fn record(&self, violation: ComplianceViolation) {
        let doc = match serde_json::to_value(&violation) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(violation = %violation.id, error = %e, "violation serialization failed, dropped");
                return;
            }
        };
        if let Err(e) = self
            .store
            .put(
                collections::COMPLIANCE_VIOLATIONS,
                &violation.id.uuid().to_string(),
                doc,
            )
            .await
        {
            warn!(violation = %violation.id, error = %e, "violation persistence failed, dropped");
        }

        if violation.severity.triggers_alert() {
            if let Err(e) = self.alerts.send_alert(&violation).await {
                warn!(violation = %violation.id, error = %e, "violation alert failed");
            }
        }
    }
}

impl std::fmt::Debug for ViolationEscalator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViolationEscalator").finish_non_exhaustive()
    }
}
