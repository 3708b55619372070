//! End-to-end access decision scenarios over an in-memory store.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use vigil_audit::testing::RecordingAlertChannel;
use vigil_consent::{
    AccessRequest, ConsentScope, ConsentStatus, ConsentType, DataCategory, PatientConsent,
};
use vigil_engine::{AccessDecisionEngine, CoreConfig, EngineError, PatientContext};
use vigil_store::{collections, DocumentStore, MemoryStore, Query};
use vigil_types::{
    AuthPrincipal, ConsentId, PatientId, PermissionId, RiskLevel, RoleId, Sensitivity,
    StaticIdentity, UserId,
};

struct Harness {
    store: Arc<MemoryStore>,
    alerts: Arc<RecordingAlertChannel>,
    engine: AccessDecisionEngine,
    clinician: UserId,
}

/// Engine with a signed-in, verified clinician holding the builtin
/// clinician role.
async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(StaticIdentity::signed_in(AuthPrincipal::verified(
        "dr-c",
        "dr.c@clinic.example",
    )));
    let alerts = Arc::new(RecordingAlertChannel::new());
    let engine = AccessDecisionEngine::bootstrap(
        store.clone(),
        identity,
        alerts.clone(),
        &CoreConfig::default(),
    )
    .await
    .expect("bootstrap");

    let clinician = UserId::new("dr-c");
    engine
        .catalog()
        .assign_role(
            &clinician,
            &RoleId::new("role_clinician"),
            &UserId::new("admin"),
            None,
        )
        .await
        .expect("assign clinician role");

    Harness {
        store,
        alerts,
        engine,
        clinician,
    }
}

fn unrestricted_consent(id: &str, patient: &str) -> PatientConsent {
    PatientConsent {
        id: ConsentId::new(id),
        patient_id: PatientId::new(patient),
        consent_type: ConsentType::Treatment,
        status: ConsentStatus::Granted,
        scope: ConsentScope::unrestricted(),
        data_categories: vec![DataCategory::new("demographics", Sensitivity::Low)],
        created_at: Utc::now() - ChronoDuration::days(1),
        expires_at: None,
        revoked_at: None,
        revoked_by: None,
        revoked_reason: None,
        signature: None,
    }
}

async fn settle(harness: &Harness) {
    while harness.engine.pipeline().queue_len() > 0 {
        harness.engine.pipeline().flush_now().await;
        tokio::task::yield_now().await;
    }
}

async fn audit_entries(store: &MemoryStore) -> Vec<serde_json::Value> {
    store
        .query(collections::AUDIT_LOG, &Query::new())
        .await
        .expect("query audit log")
}

async fn violations(store: &MemoryStore) -> Vec<serde_json::Value> {
    store
        .query(collections::COMPLIANCE_VIOLATIONS, &Query::new())
        .await
        .expect("query violations")
}

#[tokio::test]
async fn consented_read_is_allowed_with_one_success_audit_entry() {
    let h = harness().await;
    h.engine
        .consents()
        .grant_consent(&unrestricted_consent("c-1", "p-1"))
        .await
        .expect("grant");

    let ctx = PatientContext::new(
        AccessRequest::for_patient("p-1").with_categories(&["demographics"]),
    );
    let decision = h
        .engine
        .check_access(&h.clinician, &PermissionId::new("patient", "read"), Some(&ctx))
        .await
        .expect("decision");

    assert!(decision.is_allowed());
    assert_eq!(decision.risk_level, RiskLevel::Low);
    assert_eq!(decision.consent_id.as_ref().map(ConsentId::as_str), Some("c-1"));
    assert!(!decision.audit_required);

    settle(&h).await;
    let entries = audit_entries(&h.store).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["actionResult"], "success");
    assert_eq!(entries[0]["actor"]["userId"], "dr-c");
    assert!(violations(&h.store).await.is_empty());
}

#[tokio::test]
async fn zero_consents_denies_with_violation_and_failure_audit_entry() {
    let h = harness().await;

    let ctx = PatientContext::new(
        AccessRequest::for_patient("q-1").with_categories(&["demographics"]),
    );
    let decision = h
        .engine
        .check_access(&h.clinician, &PermissionId::new("patient", "read"), Some(&ctx))
        .await
        .expect("decision");

    assert!(!decision.is_allowed());
    assert_eq!(decision.justification, "no applicable consent on record");

    settle(&h).await;
    let entries = audit_entries(&h.store).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["actionResult"], "failure");

    let recorded = violations(&h.store).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["violationType"], "unauthorized_access");
    assert_eq!(recorded[0]["patientId"], "q-1");
    // High severity triggered an alert.
    assert_eq!(h.alerts.alert_count(), 1);
}

#[tokio::test]
async fn missing_permission_denies_without_touching_consents() {
    let h = harness().await;
    let staff = UserId::new("staff-1");
    h.engine
        .catalog()
        .assign_role(
            &staff,
            &RoleId::new("role_clinic_staff"),
            &UserId::new("admin"),
            None,
        )
        .await
        .expect("assign");

    let ctx = PatientContext::new(AccessRequest::for_patient("p-1"));
    let decision = h
        .engine
        .check_access(&staff, &PermissionId::new("patient", "write"), Some(&ctx))
        .await
        .expect("decision");

    assert!(!decision.is_allowed());
    assert_eq!(decision.justification, "permission not found in user roles");

    settle(&h).await;
    let recorded = violations(&h.store).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["violationType"], "unauthorized_access");
}

#[tokio::test]
async fn scope_mismatch_yields_no_applicable_consent() {
    let h = harness().await;
    let mut consent = unrestricted_consent("c-1", "p-1");
    consent.scope.facilities = vec![vigil_types::FacilityId::new("F1")];
    h.engine
        .consents()
        .grant_consent(&consent)
        .await
        .expect("grant");

    let ctx = PatientContext::new(
        AccessRequest::for_patient("p-1")
            .at_facility("F2")
            .with_categories(&["demographics"]),
    );
    let decision = h
        .engine
        .check_access(&h.clinician, &PermissionId::new("patient", "read"), Some(&ctx))
        .await
        .expect("decision");

    assert!(!decision.is_allowed());

    settle(&h).await;
    let recorded = violations(&h.store).await;
    assert_eq!(recorded.len(), 1);
    // The only consent does not cover facility F2, so resolution finds
    // nothing applicable.
    assert_eq!(recorded[0]["violationType"], "unauthorized_access");
}

#[tokio::test]
async fn emergency_override_allowed_for_clinician_at_critical_risk() {
    let h = harness().await;

    let ctx = PatientContext::emergency(
        AccessRequest::for_patient("p-1").with_categories(&["labs"]),
    );
    let decision = h
        .engine
        .check_access(&h.clinician, &PermissionId::new("patient", "read"), Some(&ctx))
        .await
        .expect("decision");

    assert!(decision.is_allowed());
    assert_eq!(decision.risk_level, RiskLevel::Critical);
    assert!(decision.audit_required);
    assert!(decision.consent_id.is_none());

    settle(&h).await;
    let entries = audit_entries(&h.store).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["actionResult"], "success");
}

#[tokio::test]
async fn emergency_override_refused_without_emergency_permission() {
    let h = harness().await;
    let staff = UserId::new("staff-1");
    h.engine
        .catalog()
        .assign_role(
            &staff,
            &RoleId::new("role_clinic_staff"),
            &UserId::new("admin"),
            None,
        )
        .await
        .expect("assign");

    let ctx = PatientContext::emergency(AccessRequest::for_patient("p-1"));
    let decision = h
        .engine
        .check_access(&staff, &PermissionId::new("patient", "read"), Some(&ctx))
        .await
        .expect("decision");

    assert!(!decision.is_allowed());
    assert_eq!(decision.risk_level, RiskLevel::Critical);

    settle(&h).await;
    let recorded = violations(&h.store).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["violationType"], "purpose_violation");
    assert_eq!(recorded[0]["severity"], "critical");
    assert_eq!(h.alerts.alert_count(), 1);
}

#[tokio::test]
async fn role_only_check_needs_no_consent() {
    let h = harness().await;

    let decision = h
        .engine
        .check_access(&h.clinician, &PermissionId::new("record", "write"), None)
        .await
        .expect("decision");

    assert!(decision.is_allowed());
    assert_eq!(decision.risk_level, RiskLevel::Low);
    assert!(decision.consent_id.is_none());

    settle(&h).await;
    assert_eq!(audit_entries(&h.store).await.len(), 1);
}

#[tokio::test]
async fn revoked_consent_denies_immediately_after_revocation() {
    let h = harness().await;
    h.engine
        .consents()
        .grant_consent(&unrestricted_consent("c-1", "p-1"))
        .await
        .expect("grant");

    let ctx = PatientContext::new(
        AccessRequest::for_patient("p-1").with_categories(&["demographics"]),
    );
    let permission = PermissionId::new("patient", "read");

    // Warm the consent cache with an allow.
    assert!(h
        .engine
        .check_access(&h.clinician, &permission, Some(&ctx))
        .await
        .expect("decision")
        .is_allowed());

    h.engine
        .consents()
        .revoke_consent(&ConsentId::new("c-1"), &UserId::new("p-1"), "patient request")
        .await
        .expect("revoke");

    let decision = h
        .engine
        .check_access(&h.clinician, &permission, Some(&ctx))
        .await
        .expect("decision");
    assert!(!decision.is_allowed(), "revocation must be visible immediately");
}

#[tokio::test]
async fn store_fault_during_decision_fails_closed() {
    let h = harness().await;
    h.engine
        .consents()
        .grant_consent(&unrestricted_consent("c-1", "p-1"))
        .await
        .expect("grant");

    // A fresh user's assignment lookup must hit the store; the armed
    // read fault makes the decision unanswerable.
    let fresh = UserId::new("dr-new");
    h.engine
        .catalog()
        .assign_role(
            &fresh,
            &RoleId::new("role_clinician"),
            &UserId::new("admin"),
            None,
        )
        .await
        .expect("assign");

    h.store.fail_reads(1);
    let ctx = PatientContext::new(
        AccessRequest::for_patient("p-1").with_categories(&["demographics"]),
    );
    let err = h
        .engine
        .check_access(&fresh, &PermissionId::new("patient", "read"), Some(&ctx))
        .await
        .expect_err("must fail closed, not deny or allow");
    assert!(matches!(err, EngineError::Rbac(_)));

    // The same question succeeds once the store recovers.
    let decision = h
        .engine
        .check_access(&fresh, &PermissionId::new("patient", "read"), Some(&ctx))
        .await
        .expect("decision");
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn every_decision_audits_exactly_once() {
    let h = harness().await;
    h.engine
        .consents()
        .grant_consent(&unrestricted_consent("c-1", "p-1"))
        .await
        .expect("grant");

    let permission = PermissionId::new("patient", "read");
    let ctx = PatientContext::new(
        AccessRequest::for_patient("p-1").with_categories(&["demographics"]),
    );

    for _ in 0..3 {
        h.engine
            .check_access(&h.clinician, &permission, Some(&ctx))
            .await
            .expect("decision");
    }
    h.engine
        .check_access(&h.clinician, &permission, None)
        .await
        .expect("decision");

    settle(&h).await;
    assert_eq!(audit_entries(&h.store).await.len(), 4);
}
