//! The access decision engine.
//!
//! Pure with respect to caller state — no retries, no hidden mutation —
//! with exactly two side effects per call: one audit event (always) and
//! one violation record (only on deny/violation).

use crate::config::CoreConfig;
use crate::decision::{AccessDecision, AccessOutcome, PatientContext};
use crate::EngineError;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use vigil_audit::{
    ActionResult, ActionType, AlertChannel, AuditEvent, AuditPipeline, ComplianceViolation,
    ViolationEscalator, ViolationType,
};
use vigil_consent::ConsentStore;
use vigil_rbac::{PermissionCatalog, PermissionCheck};
use vigil_store::DocumentStore;
use vigil_types::{
    CorrelationId, IdentityProvider, PermissionId, RiskLevel, Severity, UserId,
};

/// Permissions that authorize the emergency override, in check order.
const EMERGENCY_PERMISSIONS: [&str; 2] = ["emergency_access", "break_glass"];

/// Composes catalog, consents, audit and escalation into one decision
/// entry point.
pub struct AccessDecisionEngine {
    catalog: Arc<PermissionCatalog>,
    consents: Arc<ConsentStore>,
    pipeline: Arc<AuditPipeline>,
    escalator: Arc<ViolationEscalator>,
}

impl AccessDecisionEngine {
    /// Creates an engine from already-constructed components.
    #[must_use]
    pub fn new(
        catalog: Arc<PermissionCatalog>,
        consents: Arc<ConsentStore>,
        pipeline: Arc<AuditPipeline>,
        escalator: Arc<ViolationEscalator>,
    ) -> Self {
        Self {
            catalog,
            consents,
            pipeline,
            escalator,
        }
    }

    /// Builds a fully wired engine over one store and identity
    /// provider: bootstraps the catalog, applies the config to the
    /// consent cache and audit pipeline, and wires the escalator to the
    /// given alert channel.
    pub async fn bootstrap(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        alerts: Arc<dyn AlertChannel>,
        config: &CoreConfig,
    ) -> Result<Self, EngineError> {
        let catalog = Arc::new(PermissionCatalog::new(store.clone()));
        catalog.load_or_bootstrap().await?;

        let consents = Arc::new(
            ConsentStore::new(store.clone())
                .with_cache_ttl(config.consent.cache_ttl())
                .with_fetch_limit(config.consent.fetch_limit),
        );
        let pipeline = Arc::new(
            AuditPipeline::new(store.clone(), identity)
                .with_batch_size(config.audit.batch_size)
                .with_flush_interval(config.audit.flush_interval()),
        );
        let escalator = Arc::new(ViolationEscalator::new(store, alerts));

        Ok(Self::new(catalog, consents, pipeline, escalator))
    }

    /// The audit pipeline, for spawning its flush timer and reading its
    /// counters.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<AuditPipeline> {
        &self.pipeline
    }

    /// The permission catalog, for role administration.
    #[must_use]
    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// The consent store, for consent administration.
    #[must_use]
    pub fn consents(&self) -> &Arc<ConsentStore> {
        &self.consents
    }

    /// Decides whether `user_id` may exercise `permission` in the given
    /// patient context.
    ///
    /// Denials come back as decisions; only an unanswerable question —
    /// a store fault during permission or consent resolution — is an
    /// error, and it fails closed.
    pub async fn check_access(
        &self,
        user_id: &UserId,
        permission: &PermissionId,
        patient_context: Option<&PatientContext>,
    ) -> Result<AccessDecision, EngineError> {
        let correlation_id = CorrelationId::new();
        let context = condition_context(patient_context);

        let check = match self
            .catalog
            .has_permission(user_id, permission, &context)
            .await
        {
            Ok(check) => check,
            Err(e) => {
                self.audit_check_fault(user_id, permission, correlation_id);
                return Err(e.into());
            }
        };

        if let PermissionCheck::Denied { reason } = check {
            return Ok(self
                .deny(
                    user_id,
                    permission,
                    patient_context,
                    correlation_id,
                    ViolationType::UnauthorizedAccess,
                    Severity::High,
                    &reason,
                )
                .await);
        }

        let Some(ctx) = patient_context else {
            // Role-only check; no patient data in play.
            let decision = AccessDecision {
                principal: user_id.clone(),
                permission: permission.clone(),
                consent_id: None,
                risk_level: RiskLevel::Low,
                audit_required: false,
                outcome: AccessOutcome::Allow,
                justification: "permission granted by role assignment".to_string(),
                correlation_id,
            };
            self.audit_decision(&decision, None);
            return Ok(decision);
        };

        if ctx.emergency_override {
            return self.check_emergency(user_id, permission, ctx, correlation_id).await;
        }

        let consent = match self
            .consents
            .find_applicable_consent(&ctx.request.patient_id, &ctx.request)
            .await
        {
            Ok(consent) => consent,
            Err(e) => {
                self.audit_check_fault(user_id, permission, correlation_id);
                return Err(e.into());
            }
        };

        let Some(consent) = consent else {
            return Ok(self
                .deny(
                    user_id,
                    permission,
                    Some(ctx),
                    correlation_id,
                    ViolationType::UnauthorizedAccess,
                    Severity::High,
                    "no applicable consent on record",
                )
                .await);
        };

        let verification = self.consents.verify_scope(&consent, &ctx.request);
        if !verification.valid {
            let mut decision = self
                .deny(
                    user_id,
                    permission,
                    Some(ctx),
                    correlation_id,
                    ViolationType::ScopeViolation,
                    Severity::High,
                    "consent does not cover the requested scope",
                )
                .await;
            decision.consent_id = Some(consent.id);
            return Ok(decision);
        }

        let decision = AccessDecision {
            principal: user_id.clone(),
            permission: permission.clone(),
            consent_id: Some(consent.id),
            risk_level: verification.risk_level,
            audit_required: verification.audit_required,
            outcome: AccessOutcome::Allow,
            justification: "consent covers the requested access".to_string(),
            correlation_id,
        };
        debug!(user = %user_id, permission = %permission, risk = %decision.risk_level, "access allowed");
        self.audit_decision(&decision, Some(ctx));
        Ok(decision)
    }

    /// Emergency override: honored only for principals holding an
    /// emergency-access permission; always critical risk, always
    /// audited.
    async fn check_emergency(
        &self,
        user_id: &UserId,
        permission: &PermissionId,
        ctx: &PatientContext,
        correlation_id: CorrelationId,
    ) -> Result<AccessDecision, EngineError> {
        let mut authorized = false;
        for emergency_permission in EMERGENCY_PERMISSIONS {
            let check = self
                .catalog
                .has_permission(
                    user_id,
                    &PermissionId::standalone(emergency_permission),
                    &Map::new(),
                )
                .await
                .map_err(|e| {
                    self.audit_check_fault(user_id, permission, correlation_id);
                    e
                })?;
            if check.is_granted() {
                authorized = true;
                break;
            }
        }

        if !authorized {
            warn!(user = %user_id, patient = %ctx.request.patient_id, "emergency override refused");
            return Ok(self
                .deny(
                    user_id,
                    permission,
                    Some(ctx),
                    correlation_id,
                    ViolationType::PurposeViolation,
                    Severity::Critical,
                    "emergency override requires an emergency-access permission",
                )
                .await);
        }

        let verification = self.consents.handle_emergency_access(&ctx.request);
        let decision = AccessDecision {
            principal: user_id.clone(),
            permission: permission.clone(),
            consent_id: None,
            risk_level: verification.risk_level,
            audit_required: verification.audit_required,
            outcome: AccessOutcome::Allow,
            justification: "emergency override by authorized principal".to_string(),
            correlation_id,
        };
        self.audit_decision(&decision, Some(ctx));
        Ok(decision)
    }

    /// Builds the deny decision, records its violation, and audits it.
    #[allow(clippy::too_many_arguments)]
    async fn deny(
        &self,
        user_id: &UserId,
        permission: &PermissionId,
        ctx: Option<&PatientContext>,
        correlation_id: CorrelationId,
        violation_type: ViolationType,
        severity: Severity,
        justification: &str,
    ) -> AccessDecision {
        let risk_level = if severity == Severity::Critical {
            RiskLevel::Critical
        } else {
            RiskLevel::High
        };
        let decision = AccessDecision {
            principal: user_id.clone(),
            permission: permission.clone(),
            consent_id: None,
            risk_level,
            audit_required: true,
            outcome: AccessOutcome::Deny,
            justification: justification.to_string(),
            correlation_id,
        };
        debug!(user = %user_id, permission = %permission, reason = justification, "access denied");

        self.escalator
            .record(ComplianceViolation::new(
                violation_type,
                severity,
                format!("{permission} denied: {justification}"),
                user_id.clone(),
                ctx.map(|c| c.request.patient_id.clone()),
            ))
            .await;

        self.audit_decision(&decision, ctx);
        decision
    }

    /// Enqueues the one audit event every decision produces.
    fn audit_decision(&self, decision: &AccessDecision, ctx: Option<&PatientContext>) {
        let (resource_type, resource_id) = match ctx {
            Some(ctx) => ("patient".to_string(), ctx.request.patient_id.as_str().to_string()),
            None => (
                decision.permission.resource().to_string(),
                decision.permission.as_str().to_string(),
            ),
        };
        let result = if decision.is_allowed() {
            ActionResult::Success
        } else {
            ActionResult::Failure
        };

        let mut event = AuditEvent::new(
            "access_decision",
            resource_type,
            resource_id,
            ActionType::Access,
            result,
        )
        .with_correlation(decision.correlation_id);
        if decision.audit_required {
            event = event.critical();
        }
        self.pipeline.enqueue(event);
    }

    /// Audits a check that could not complete (store fault); the error
    /// itself still propagates to the caller.
    fn audit_check_fault(
        &self,
        user_id: &UserId,
        permission: &PermissionId,
        correlation_id: CorrelationId,
    ) {
        warn!(user = %user_id, permission = %permission, "access check failed before a decision");
        self.pipeline.enqueue(
            AuditEvent::new(
                "access_check_fault",
                permission.resource(),
                permission.as_str(),
                ActionType::Access,
                ActionResult::Failure,
            )
            .with_correlation(correlation_id)
            .critical(),
        );
    }
}

impl std::fmt::Debug for AccessDecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessDecisionEngine")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Flattens the patient context into the map permission conditions are
/// evaluated against.
fn condition_context(ctx: Option<&PatientContext>) -> Map<String, Value> {
    let mut map = Map::new();
    let Some(ctx) = ctx else {
        return map;
    };
    map.insert(
        "patientId".to_string(),
        Value::String(ctx.request.patient_id.as_str().to_string()),
    );
    if let Some(facility) = &ctx.request.facility {
        map.insert(
            "facility".to_string(),
            Value::String(facility.as_str().to_string()),
        );
    }
    if let Some(provider) = &ctx.request.provider {
        map.insert(
            "provider".to_string(),
            Value::String(provider.as_str().to_string()),
        );
    }
    if let Some(service) = &ctx.request.service {
        map.insert(
            "service".to_string(),
            Value::String(service.as_str().to_string()),
        );
    }
    map.insert(
        "dataCategories".to_string(),
        Value::Array(
            ctx.request
                .data_categories
                .iter()
                .map(|c| Value::String(c.clone()))
                .collect(),
        ),
    );
    map.insert(
        "emergencyOverride".to_string(),
        Value::Bool(ctx.emergency_override),
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_consent::AccessRequest;

    #[test]
    fn condition_context_flattens_request() {
        let ctx = PatientContext::new(
            AccessRequest::for_patient("p-1")
                .at_facility("F1")
                .with_categories(&["demographics"]),
        );
        let map = condition_context(Some(&ctx));

        assert_eq!(map["patientId"], Value::String("p-1".into()));
        assert_eq!(map["facility"], Value::String("F1".into()));
        assert_eq!(map["emergencyOverride"], Value::Bool(false));
        assert!(map.get("provider").is_none());
        assert_eq!(
            map["dataCategories"],
            Value::Array(vec![Value::String("demographics".into())])
        );
    }

    #[test]
    fn empty_context_for_role_only_checks() {
        assert!(condition_context(None).is_empty());
    }
}
