//! Risk, sensitivity and severity taxonomy.
//!
//! Three four-level ordered scales share the same ladder
//! (low < medium < high < critical) but name different things:
//!
//! | Type | Attached to | Decides |
//! |------|-------------|---------|
//! | [`Sensitivity`] | a data category on a consent | how protected the data is |
//! | [`RiskLevel`] | an access decision | how closely the access is audited |
//! | [`Severity`] | a compliance violation | whether alerting fires |
//!
//! The scales are kept as distinct types so a consent's data
//! classification cannot be passed where a violation severity is
//! expected; conversions are explicit.

use serde::{Deserialize, Serialize};

/// Risk classification of an access decision.
///
/// Derived from the maximum [`Sensitivity`] among the data categories an
/// access touches. High and critical risk force `audit_required`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine access to non-sensitive data.
    #[default]
    Low,
    /// Access touching moderately sensitive categories.
    Medium,
    /// Access touching sensitive categories; always audited.
    High,
    /// Emergency overrides and the most sensitive categories; always audited.
    Critical,
}

impl RiskLevel {
    /// Returns `true` for the levels that force an audit record.
    #[must_use]
    pub fn requires_audit(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns the level as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensitivity classification of a data category on a consent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Administrative data (demographics, scheduling).
    #[default]
    Low,
    /// General clinical data.
    Medium,
    /// Sensitive clinical data (diagnoses, medications).
    High,
    /// Most protected categories (mental health, genetics, substance use).
    Critical,
}

impl Sensitivity {
    /// Returns the sensitivity as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl From<Sensitivity> for RiskLevel {
    fn from(s: Sensitivity) -> Self {
        match s {
            Sensitivity::Low => Self::Low,
            Sensitivity::Medium => Self::Medium,
            Sensitivity::High => Self::High,
            Sensitivity::Critical => Self::Critical,
        }
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a compliance violation.
///
/// High and critical severities trigger alerting when the violation is
/// recorded; low and medium are persisted for review only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; reviewed in bulk.
    #[default]
    Low,
    /// Needs review but not immediate action.
    Medium,
    /// Triggers alerting.
    High,
    /// Triggers alerting; highest escalation.
    Critical,
}

impl Severity {
    /// Returns `true` for the severities that trigger alerting.
    #[must_use]
    pub fn triggers_alert(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Returns the severity as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
