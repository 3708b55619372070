//! Audit log records.
//!
//! Callers build an [`AuditEvent`] describing what happened; the
//! pipeline stamps identity, id and timestamp to produce the persisted
//! [`AuditLogEntry`]. Entries are append-only — nothing in this core
//! mutates or deletes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_types::{AuditEntryId, CorrelationId, RequestId, UserId};

/// What kind of operation an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// A record was created.
    Create,
    /// A record was read.
    Read,
    /// A record was updated.
    Update,
    /// A record was deleted.
    Delete,
    /// An access decision was made.
    Access,
}

/// Whether the recorded operation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult {
    /// The operation was allowed / completed.
    Success,
    /// The operation was denied / failed.
    Failure,
}

/// The actor stamped onto a persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditActor {
    /// Acting user.
    pub user_id: UserId,
    /// Email at the time of the action.
    pub email: String,
}

/// A security-relevant event as submitted by a caller.
///
/// `critical` affects gating only (unverified principals still produce
/// entries for critical actions) and is not persisted itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// What happened (e.g. `"access_decision"`, `"role_assigned"`).
    pub action: String,
    /// Kind of resource touched (e.g. `"patient"`, `"consent"`).
    pub resource_type: String,
    /// Which resource was touched.
    pub resource_id: String,
    /// Operation classification.
    pub action_type: ActionType,
    /// Outcome classification.
    pub action_result: ActionResult,
    /// Critical events bypass the email-verification gate.
    pub critical: bool,
    /// Correlates entries from one logical operation.
    pub correlation_id: CorrelationId,
    /// The inbound request this event belongs to.
    pub request_id: RequestId,
}

impl AuditEvent {
    /// Creates a non-critical event with fresh correlation/request ids.
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        action_type: ActionType,
        action_result: ActionResult,
    ) -> Self {
        Self {
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            action_type,
            action_result,
            critical: false,
            correlation_id: CorrelationId::new(),
            request_id: RequestId::new(),
        }
    }

    /// Marks the event critical (builder style).
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Sets the request id.
    #[must_use]
    pub fn with_request(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }
}

/// One persisted, append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Entry id.
    pub id: AuditEntryId,
    /// When the pipeline accepted the event.
    pub timestamp: DateTime<Utc>,
    /// Who acted.
    pub actor: AuditActor,
    /// What happened.
    pub action: String,
    /// Kind of resource touched.
    pub resource_type: String,
    /// Which resource was touched.
    pub resource_id: String,
    /// Operation classification.
    pub action_type: ActionType,
    /// Outcome classification.
    pub action_result: ActionResult,
    /// Correlates entries from one logical operation.
    pub correlation_id: CorrelationId,
    /// The inbound request this entry belongs to.
    pub request_id: RequestId,
}

impl AuditLogEntry {
    /// Stamps an event into a persistable entry.
    #[must_use]
    pub fn stamp(event: AuditEvent, actor: AuditActor) -> Self {
        Self {
            id: AuditEntryId::new(),
            timestamp: Utc::now(),
            actor,
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            action_type: event.action_type,
            action_result: event.action_result,
            correlation_id: event.correlation_id,
            request_id: event.request_id,
        }
    }
}
