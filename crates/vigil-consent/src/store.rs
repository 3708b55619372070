//! Consent resolution service.
//!
//! Owns the per-patient resolution cache and all reads/writes of the
//! `patient_consents` collection. Constructed explicitly with its
//! document store (and optional cipher) injected.
//!
//! # Cache semantics
//!
//! One entry per patient holding the most recently resolved consent,
//! valid for a short TTL (5 minutes by default). An entry is served
//! only while it is fresh, still active, and still covers the incoming
//! request; [`revoke_consent`](ConsentStore::revoke_consent) evicts the
//! patient's entry synchronously, so a revoked consent is never served
//! from cache. Stale reads within the TTL window after out-of-band
//! store changes are the accepted trade-off.

use crate::cipher::RecordCipher;
use crate::consent::{ConsentStatus, PatientConsent};
use crate::request::AccessRequest;
use crate::verify::VerificationResult;
use crate::ConsentError;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use vigil_store::{collections, DocumentStore, Direction, Query};
use vigil_types::{ConsentId, PatientId, UserId};

/// Default TTL for cached resolutions.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default cap on consents fetched per resolution.
const DEFAULT_FETCH_LIMIT: usize = 10;

struct CachedResolution {
    consent: PatientConsent,
    cached_at: Instant,
}

/// Retrieves and short-TTL-caches a patient's active consents.
pub struct ConsentStore {
    store: Arc<dyn DocumentStore>,
    cipher: Option<Arc<dyn RecordCipher>>,
    cache: RwLock<HashMap<PatientId, CachedResolution>>,
    cache_ttl: Duration,
    fetch_limit: usize,
}

impl ConsentStore {
    /// Creates a consent store with default cache TTL and fetch limit
    /// and no cipher.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cipher: None,
            cache: RwLock::new(HashMap::new()),
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }

    /// Overrides the cache TTL (builder style).
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Overrides the per-resolution fetch limit.
    #[must_use]
    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit.max(1);
        self
    }

    /// Attaches the field cipher used for consent signatures.
    #[must_use]
    pub fn with_cipher(mut self, cipher: Arc<dyn RecordCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Finds the consent that authorizes this request, if any.
    ///
    /// Resolution order: active `granted` consents, newest first,
    /// re-ranked emergency > treatment > rest; the first whose scope
    /// covers the request wins. `Ok(None)` means "no consent" — the
    /// caller must deny. Store faults are errors, never `None`.
    pub async fn find_applicable_consent(
        &self,
        patient_id: &PatientId,
        request: &AccessRequest,
    ) -> Result<Option<PatientConsent>, ConsentError> {
        let now = Utc::now();

        if let Some(cached) = self.cache.read().get(patient_id) {
            if cached.cached_at.elapsed() < self.cache_ttl
                && cached.consent.is_active(now)
                && cached.consent.covers(request)
            {
                debug!(patient = %patient_id, consent = %cached.consent.id, "consent cache hit");
                return Ok(Some(cached.consent.clone()));
            }
        }

        let query = Query::new()
            .filter_eq("patientId", patient_id.as_str())
            .filter_eq("status", "granted")
            .order_by("createdAt", Direction::Descending)
            .limit(self.fetch_limit);
        let docs = self.store.query(collections::PATIENT_CONSENTS, &query).await?;

        let mut active: Vec<PatientConsent> = Vec::with_capacity(docs.len());
        for doc in docs {
            let consent: PatientConsent =
                serde_json::from_value(doc).map_err(vigil_store::StoreError::from)?;
            if consent.is_active(now) {
                active.push(consent);
            }
        }

        // Emergency first, then treatment, then newest-first within rank.
        active.sort_by_key(|c| (c.consent_type.priority_rank(), std::cmp::Reverse(c.created_at)));

        let Some(applicable) = active.into_iter().find(|c| c.covers(request)) else {
            debug!(patient = %patient_id, "no applicable consent");
            return Ok(None);
        };

        self.cache.write().insert(
            patient_id.clone(),
            CachedResolution {
                consent: applicable.clone(),
                cached_at: Instant::now(),
            },
        );
        Ok(Some(applicable))
    }

    /// Verifies a consent's scope against a request and classifies the
    /// access risk.
    #[must_use]
    pub fn verify_scope(
        &self,
        consent: &PatientConsent,
        request: &AccessRequest,
    ) -> VerificationResult {
        VerificationResult::evaluate(consent, request)
    }

    /// Shapes the verification result for an emergency override:
    /// always valid, critical risk, always audited.
    ///
    /// Authorization is not decided here — the caller must already have
    /// confirmed the principal holds an emergency-access permission.
    #[must_use]
    pub fn handle_emergency_access(&self, request: &AccessRequest) -> VerificationResult {
        warn!(patient = %request.patient_id, "emergency access invoked, bypassing consent matching");
        VerificationResult::emergency()
    }

    /// Persists a new consent record.
    ///
    /// The signature field is encrypted when a cipher is attached; a
    /// cipher fault drops the field with a warning rather than blocking
    /// the write.
    pub async fn grant_consent(&self, consent: &PatientConsent) -> Result<(), ConsentError> {
        let mut stored = consent.clone();
        stored.signature = match (&self.cipher, consent.signature.as_deref()) {
            (Some(cipher), Some(signature)) => match cipher.encrypt(signature) {
                Ok(ciphertext) => Some(ciphertext),
                Err(e) => {
                    warn!(consent = %consent.id, error = %e, "signature encryption failed, field dropped");
                    None
                }
            },
            (None, Some(_)) => {
                warn!(consent = %consent.id, "no cipher available, signature field dropped");
                None
            }
            (_, None) => None,
        };

        let doc = serde_json::to_value(&stored).map_err(vigil_store::StoreError::from)?;
        self.store
            .put(collections::PATIENT_CONSENTS, stored.id.as_str(), doc)
            .await?;
        Ok(())
    }

    /// Revokes a consent (terminal transition) and synchronously evicts
    /// the patient's cache entry.
    pub async fn revoke_consent(
        &self,
        consent_id: &ConsentId,
        revoked_by: &UserId,
        reason: impl Into<String>,
    ) -> Result<(), ConsentError> {
        let doc = self
            .store
            .get(collections::PATIENT_CONSENTS, consent_id.as_str())
            .await?
            .ok_or_else(|| ConsentError::NotFound(consent_id.clone()))?;
        let mut consent: PatientConsent =
            serde_json::from_value(doc).map_err(vigil_store::StoreError::from)?;

        if consent.status == ConsentStatus::Revoked {
            return Err(ConsentError::AlreadyRevoked(consent_id.clone()));
        }

        consent.status = ConsentStatus::Revoked;
        consent.revoked_at = Some(Utc::now());
        consent.revoked_by = Some(revoked_by.clone());
        consent.revoked_reason = Some(reason.into());

        let updated = serde_json::to_value(&consent).map_err(vigil_store::StoreError::from)?;
        self.store
            .put(collections::PATIENT_CONSENTS, consent.id.as_str(), updated)
            .await?;

        self.cache.write().remove(&consent.patient_id);
        debug!(consent = %consent_id, patient = %consent.patient_id, "consent revoked, cache evicted");
        Ok(())
    }

    /// Decrypts a consent's signature, if present and a cipher is
    /// attached. Returns `None` when either is missing or the cipher
    /// fails (logged, never fatal).
    #[must_use]
    pub fn decrypt_signature(&self, consent: &PatientConsent) -> Option<String> {
        let cipher = self.cipher.as_ref()?;
        let ciphertext = consent.signature.as_deref()?;
        match cipher.decrypt(ciphertext) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                warn!(consent = %consent.id, error = %e, "signature decryption failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentStore")
            .field("cached_patients", &self.cache.read().len())
            .field("cache_ttl", &self.cache_ttl)
            .field("fetch_limit", &self.fetch_limit)
            .field("cipher", &self.cipher.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::testing::ReversingCipher;
    use crate::consent::{ConsentScope, ConsentType, DataCategory};
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use vigil_store::MemoryStore;
    use vigil_types::{FacilityId, Sensitivity};

    fn consent(
        id: &str,
        patient: &str,
        consent_type: ConsentType,
        created_at: DateTime<Utc>,
    ) -> PatientConsent {
        PatientConsent {
            id: ConsentId::new(id),
            patient_id: PatientId::new(patient),
            consent_type,
            status: ConsentStatus::Granted,
            scope: ConsentScope::unrestricted(),
            data_categories: vec![DataCategory::new("demographics", Sensitivity::Low)],
            created_at,
            expires_at: None,
            revoked_at: None,
            revoked_by: None,
            revoked_reason: None,
            signature: None,
        }
    }

    async fn seeded(consents: &[PatientConsent]) -> (Arc<MemoryStore>, ConsentStore) {
        let store = Arc::new(MemoryStore::new());
        let consent_store = ConsentStore::new(store.clone());
        for c in consents {
            consent_store.grant_consent(c).await.expect("grant");
        }
        (store, consent_store)
    }

    fn request(patient: &str) -> AccessRequest {
        AccessRequest::for_patient(patient).with_categories(&["demographics"])
    }

    #[tokio::test]
    async fn returns_none_when_patient_has_no_consents() {
        let (_, consents) = seeded(&[]).await;
        let found = consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn emergency_outranks_newer_treatment() {
        let now = Utc::now();
        let emergency = consent("c-em", "p-1", ConsentType::Emergency, now - ChronoDuration::days(1));
        let treatment = consent("c-tr", "p-1", ConsentType::Treatment, now);
        let (_, consents) = seeded(&[treatment, emergency]).await;

        let found = consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve")
            .expect("applicable");
        assert_eq!(found.id.as_str(), "c-em");
    }

    #[tokio::test]
    async fn newest_wins_within_same_rank() {
        let now = Utc::now();
        let older = consent("c-old", "p-1", ConsentType::Treatment, now - ChronoDuration::days(2));
        let newer = consent("c-new", "p-1", ConsentType::Treatment, now);
        let (_, consents) = seeded(&[older, newer]).await;

        let found = consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve")
            .expect("applicable");
        assert_eq!(found.id.as_str(), "c-new");
    }

    #[tokio::test]
    async fn expired_consents_are_filtered() {
        let now = Utc::now();
        let mut expired = consent("c-1", "p-1", ConsentType::Treatment, now - ChronoDuration::days(2));
        expired.expires_at = Some(now - ChronoDuration::hours(1));
        let (_, consents) = seeded(&[expired]).await;

        let found = consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn scope_mismatch_skips_to_next_covering_consent() {
        let now = Utc::now();
        let mut narrow = consent("c-narrow", "p-1", ConsentType::Treatment, now);
        narrow.scope.facilities = vec![FacilityId::new("F1")];
        let broad = consent("c-broad", "p-1", ConsentType::Treatment, now - ChronoDuration::days(1));
        let (_, consents) = seeded(&[narrow, broad]).await;

        let req = request("p-1").at_facility("F2");
        let found = consents
            .find_applicable_consent(&PatientId::new("p-1"), &req)
            .await
            .expect("resolve")
            .expect("applicable");
        assert_eq!(found.id.as_str(), "c-broad");
    }

    #[tokio::test]
    async fn cache_serves_within_ttl() {
        let now = Utc::now();
        let first = consent("c-1", "p-1", ConsentType::Treatment, now - ChronoDuration::days(1));
        let (store, consents) = seeded(&[first]).await;

        let resolved = consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve")
            .expect("applicable");
        assert_eq!(resolved.id.as_str(), "c-1");

        // A newer consent lands directly in the store; within the TTL
        // the cached resolution is still served.
        let newer = consent("c-2", "p-1", ConsentType::Treatment, now);
        store
            .put(
                collections::PATIENT_CONSENTS,
                "c-2",
                serde_json::to_value(&newer).expect("serialize"),
            )
            .await
            .expect("put");

        let resolved = consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve")
            .expect("applicable");
        assert_eq!(resolved.id.as_str(), "c-1", "cache hit expected");
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let now = Utc::now();
        let first = consent("c-1", "p-1", ConsentType::Treatment, now - ChronoDuration::days(1));
        let store = Arc::new(MemoryStore::new());
        let consents = ConsentStore::new(store.clone()).with_cache_ttl(Duration::ZERO);
        consents.grant_consent(&first).await.expect("grant");

        consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve")
            .expect("applicable");

        let newer = consent("c-2", "p-1", ConsentType::Treatment, now);
        consents.grant_consent(&newer).await.expect("grant");

        let resolved = consents
            .find_applicable_consent(&PatientId::new("p-1"), &request("p-1"))
            .await
            .expect("resolve")
            .expect("applicable");
        assert_eq!(resolved.id.as_str(), "c-2");
    }

    #[tokio::test]
    async fn revoked_consent_is_never_returned_even_if_cached() {
        let now = Utc::now();
        let c = consent("c-1", "p-1", ConsentType::Treatment, now);
        let (_, consents) = seeded(&[c]).await;
        let patient = PatientId::new("p-1");

        // Warm the cache.
        assert!(consents
            .find_applicable_consent(&patient, &request("p-1"))
            .await
            .expect("resolve")
            .is_some());

        consents
            .revoke_consent(&ConsentId::new("c-1"), &UserId::new("p-1"), "patient request")
            .await
            .expect("revoke");

        let found = consents
            .find_applicable_consent(&patient, &request("p-1"))
            .await
            .expect("resolve");
        assert!(found.is_none(), "revoked consent must not be served");
    }

    #[tokio::test]
    async fn revoke_is_terminal() {
        let c = consent("c-1", "p-1", ConsentType::Treatment, Utc::now());
        let (_, consents) = seeded(&[c]).await;
        let id = ConsentId::new("c-1");
        let by = UserId::new("p-1");

        consents.revoke_consent(&id, &by, "first").await.expect("revoke");
        let err = consents
            .revoke_consent(&id, &by, "second")
            .await
            .expect_err("terminal");
        assert!(matches!(err, ConsentError::AlreadyRevoked(_)));
    }

    #[tokio::test]
    async fn revoke_unknown_consent_is_not_found() {
        let (_, consents) = seeded(&[]).await;
        let err = consents
            .revoke_consent(&ConsentId::new("c-x"), &UserId::new("u"), "r")
            .await
            .expect_err("missing");
        assert!(matches!(err, ConsentError::NotFound(_)));
    }

    #[tokio::test]
    async fn signature_is_encrypted_at_rest_and_decryptable() {
        let cipher = Arc::new(ReversingCipher::new());
        let store = Arc::new(MemoryStore::new());
        let consents = ConsentStore::new(store.clone()).with_cipher(cipher);

        let mut c = consent("c-1", "p-1", ConsentType::Treatment, Utc::now());
        c.signature = Some("signed-by-patient".to_string());
        consents.grant_consent(&c).await.expect("grant");

        let doc = store
            .get(collections::PATIENT_CONSENTS, "c-1")
            .await
            .expect("get")
            .expect("present");
        let stored_signature = doc["signature"].as_str().expect("signature present");
        assert_ne!(stored_signature, "signed-by-patient");

        let stored: PatientConsent = serde_json::from_value(doc).expect("parse");
        assert_eq!(
            consents.decrypt_signature(&stored).as_deref(),
            Some("signed-by-patient")
        );
    }

    #[tokio::test]
    async fn cipher_fault_drops_signature_but_write_succeeds() {
        let cipher = Arc::new(ReversingCipher::new());
        cipher.set_failing(true);
        let store = Arc::new(MemoryStore::new());
        let consents = ConsentStore::new(store.clone()).with_cipher(cipher);

        let mut c = consent("c-1", "p-1", ConsentType::Treatment, Utc::now());
        c.signature = Some("signed-by-patient".to_string());
        consents.grant_consent(&c).await.expect("write still succeeds");

        let doc = store
            .get(collections::PATIENT_CONSENTS, "c-1")
            .await
            .expect("get")
            .expect("present");
        assert!(doc["signature"].is_null());
    }

    #[tokio::test]
    async fn store_fault_is_an_error_not_none() {
        let c = consent("c-1", "p-1", ConsentType::Treatment, Utc::now());
        let (store, consents) = seeded(&[c]).await;

        store.fail_next(1);
        let err = consents
            .revoke_consent(&ConsentId::new("c-1"), &UserId::new("u"), "r")
            .await
            .expect_err("store down");
        assert!(matches!(
            err,
            ConsentError::Store(vigil_store::StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn emergency_access_shape() {
        let (_, consents) = seeded(&[]).await;
        let result = consents.handle_emergency_access(&request("p-1"));
        assert!(result.valid);
        assert!(result.audit_required);
        assert_eq!(result.risk_level, vigil_types::RiskLevel::Critical);
    }
}
