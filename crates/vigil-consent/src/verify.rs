//! Scope verification results.
//!
//! [`VerificationResult`] is what the decision engine folds into its
//! access decision: whether the consent covers the request, how risky
//! the access is, and whether auditing is forced.

use crate::{AccessRequest, PatientConsent};
use serde::{Deserialize, Serialize};
use vigil_types::RiskLevel;

/// How many requested categories force an audit regardless of risk.
pub(crate) const BROAD_REQUEST_THRESHOLD: usize = 5;

/// Outcome of verifying a consent's scope against a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the consent covers the request.
    pub valid: bool,
    /// Maximum sensitivity among the matched data categories.
    pub risk_level: RiskLevel,
    /// Whether this access must produce an audit record.
    pub audit_required: bool,
    /// Scope dimensions the consent restricts (informational).
    pub restrictions: Vec<String>,
}

impl VerificationResult {
    /// Computes the result for a consent against a request.
    ///
    /// Risk is the maximum sensitivity among the consent categories the
    /// request actually touches. Auditing is forced for high/critical
    /// risk and for broad requests (more than
    /// [`BROAD_REQUEST_THRESHOLD`] categories).
    #[must_use]
    pub fn evaluate(consent: &PatientConsent, request: &AccessRequest) -> Self {
        let valid = consent.covers(request);

        let risk_level = consent
            .data_categories
            .iter()
            .filter(|c| request.data_categories.contains(&c.category))
            .map(|c| RiskLevel::from(c.sensitivity))
            .max()
            .unwrap_or(RiskLevel::Low);

        let audit_required = risk_level.requires_audit()
            || request.data_categories.len() > BROAD_REQUEST_THRESHOLD;

        Self {
            valid,
            risk_level,
            audit_required,
            restrictions: consent.scope.restrictions(),
        }
    }

    /// The fixed shape of an emergency override: valid, critical risk,
    /// always audited.
    #[must_use]
    pub fn emergency() -> Self {
        Self {
            valid: true,
            risk_level: RiskLevel::Critical,
            audit_required: true,
            restrictions: Vec::new(),
        }
    }
}
