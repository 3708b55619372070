//! Access request shape matched against consent scopes.

use serde::{Deserialize, Serialize};
use vigil_types::{FacilityId, PatientId, ProviderId, ServiceId};

/// What an actor wants to touch, expressed in consent-scope terms.
///
/// Unspecified dimensions (`None`) never restrict matching — a request
/// that names no facility can be covered by a facility-scoped consent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    /// The data subject.
    pub patient_id: PatientId,
    /// Facility the access happens at, if known.
    #[serde(default)]
    pub facility: Option<FacilityId>,
    /// Provider performing the access, if known.
    #[serde(default)]
    pub provider: Option<ProviderId>,
    /// Clinical service involved, if known.
    #[serde(default)]
    pub service: Option<ServiceId>,
    /// Geographic context, if known.
    #[serde(default)]
    pub geographic_scope: Option<String>,
    /// Data categories the access touches.
    #[serde(default)]
    pub data_categories: Vec<String>,
}

impl AccessRequest {
    /// Creates a request naming only the patient.
    #[must_use]
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: PatientId::new(patient_id),
            facility: None,
            provider: None,
            service: None,
            geographic_scope: None,
            data_categories: Vec::new(),
        }
    }

    /// Sets the facility (builder style).
    #[must_use]
    pub fn at_facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(FacilityId::new(facility));
        self
    }

    /// Sets the provider.
    #[must_use]
    pub fn by_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(ProviderId::new(provider));
        self
    }

    /// Sets the service.
    #[must_use]
    pub fn for_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(ServiceId::new(service));
        self
    }

    /// Adds requested data categories.
    #[must_use]
    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.data_categories
            .extend(categories.iter().map(|c| (*c).to_string()));
        self
    }
}
