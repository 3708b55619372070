//! Patient consent records.
//!
//! A consent's "active" state is a derived predicate (`granted` and not
//! past expiry), never a stored flag — expiry needs no background job to
//! take effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_types::{ConsentId, FacilityId, PatientId, ProviderId, Sensitivity, ServiceId, UserId};

use crate::request::AccessRequest;

/// Purpose category of a consent.
///
/// Drives resolution priority: emergency consents are considered before
/// treatment, which are considered before everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentType {
    /// Emergency care; highest resolution priority.
    Emergency,
    /// Routine treatment; second priority.
    Treatment,
    /// Research participation.
    Research,
    /// Marketing communications.
    Marketing,
    /// Data sharing with external parties.
    DataSharing,
}

impl ConsentType {
    /// Resolution priority rank; lower sorts first.
    #[must_use]
    pub fn priority_rank(&self) -> u8 {
        match self {
            Self::Emergency => 0,
            Self::Treatment => 1,
            Self::Research | Self::Marketing | Self::DataSharing => 2,
        }
    }
}

/// Stored lifecycle state of a consent.
///
/// `Expired` exists for consents explicitly marked by upstream jobs;
/// time-based expiry is the derived check in
/// [`PatientConsent::is_active`], not a stored transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentStatus {
    /// Consent is in force (subject to expiry).
    Granted,
    /// Terminal: withdrawn by the patient or on their behalf.
    Revoked,
    /// Temporarily suspended pending review.
    Suspended,
    /// Marked expired by an upstream retention job.
    Expired,
}

/// Where a consent applies. Empty sets are unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentScope {
    /// Facilities the consent covers; empty = any facility.
    #[serde(default)]
    pub facilities: Vec<FacilityId>,
    /// Providers the consent covers; empty = any provider.
    #[serde(default)]
    pub providers: Vec<ProviderId>,
    /// Services the consent covers; empty = any service.
    #[serde(default)]
    pub services: Vec<ServiceId>,
    /// Optional geographic restriction, matched by equality when both
    /// the consent and the request specify one.
    #[serde(default)]
    pub geographic_scope: Option<String>,
}

impl ConsentScope {
    /// Unrestricted scope: covers every request.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Returns `true` if this scope covers the request.
    ///
    /// Each dimension restricts only when the consent names values for
    /// it *and* the request specifies one.
    #[must_use]
    pub fn covers(&self, request: &AccessRequest) -> bool {
        if let Some(facility) = &request.facility {
            if !self.facilities.is_empty() && !self.facilities.contains(facility) {
                return false;
            }
        }
        if let Some(provider) = &request.provider {
            if !self.providers.is_empty() && !self.providers.contains(provider) {
                return false;
            }
        }
        if let Some(service) = &request.service {
            if !self.services.is_empty() && !self.services.contains(service) {
                return false;
            }
        }
        if let (Some(consent_geo), Some(request_geo)) =
            (&self.geographic_scope, &request.geographic_scope)
        {
            if consent_geo != request_geo {
                return false;
            }
        }
        true
    }

    /// Names the dimensions this scope actually restricts.
    #[must_use]
    pub fn restrictions(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.facilities.is_empty() {
            out.push("facilities".to_string());
        }
        if !self.providers.is_empty() {
            out.push("providers".to_string());
        }
        if !self.services.is_empty() {
            out.push("services".to_string());
        }
        if self.geographic_scope.is_some() {
            out.push("geographic".to_string());
        }
        out
    }
}

/// One data category a consent covers, with its sensitivity class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCategory {
    /// Category name (e.g. `"demographics"`, `"labs"`).
    pub category: String,
    /// How protected data in this category is.
    pub sensitivity: Sensitivity,
}

impl DataCategory {
    /// Creates a category with the given sensitivity.
    #[must_use]
    pub fn new(category: impl Into<String>, sensitivity: Sensitivity) -> Self {
        Self {
            category: category.into(),
            sensitivity,
        }
    }
}

/// A patient's recorded consent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientConsent {
    /// Consent record id.
    pub id: ConsentId,
    /// The data subject.
    pub patient_id: PatientId,
    /// Purpose category.
    pub consent_type: ConsentType,
    /// Stored lifecycle state.
    pub status: ConsentStatus,
    /// Where the consent applies.
    #[serde(default)]
    pub scope: ConsentScope,
    /// Data categories the consent covers.
    #[serde(default)]
    pub data_categories: Vec<DataCategory>,
    /// When the consent was recorded.
    pub created_at: DateTime<Utc>,
    /// Optional expiry; `None` means indefinite.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Set on revocation.
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    /// Who revoked.
    #[serde(default)]
    pub revoked_by: Option<UserId>,
    /// Why revoked.
    #[serde(default)]
    pub revoked_reason: Option<String>,
    /// Patient signature; encrypted at rest when a cipher is available.
    #[serde(default)]
    pub signature: Option<String>,
}

impl PatientConsent {
    /// A consent is active iff `status == granted` and its expiry, if
    /// any, is in the future.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == ConsentStatus::Granted
            && self.expires_at.is_none_or(|expiry| expiry > now)
    }

    /// Returns `true` if the scope covers the request *and* every
    /// requested data category appears in this consent.
    #[must_use]
    pub fn covers(&self, request: &AccessRequest) -> bool {
        if !self.scope.covers(request) {
            return false;
        }
        request.data_categories.iter().all(|requested| {
            self.data_categories
                .iter()
                .any(|c| c.category == *requested)
        })
    }
}
