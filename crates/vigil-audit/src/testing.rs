//! Test support for audit collaborators.
//!
//! Public so downstream crates (the decision engine's integration
//! tests) can assert on alerting without standing up a real channel.

use crate::violation::{AlertChannel, ComplianceViolation};
use crate::AuditError;
use async_trait::async_trait;
use parking_lot::Mutex;

/// Alert channel that records every alert it receives.
#[derive(Default)]
pub struct RecordingAlertChannel {
    alerts: Mutex<Vec<ComplianceViolation>>,
    failing: bool,
}

impl RecordingAlertChannel {
    /// Creates a channel that accepts and records alerts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel whose deliveries always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Number of alerts delivered so far.
    #[must_use]
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().len()
    }

    /// Snapshot of the delivered alerts.
    #[must_use]
    pub fn alerts(&self) -> Vec<ComplianceViolation> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingAlertChannel {
    async fn send_alert(&self, violation: &ComplianceViolation) -> Result<(), AuditError> {
        if self.failing {
            return Err(AuditError::Alert("recording channel set to fail".into()));
        }
        self.alerts.lock().push(violation.clone());
        Ok(())
    }
}

impl std::fmt::Debug for RecordingAlertChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingAlertChannel")
            .field("alerts", &self.alert_count())
            .field("failing", &self.failing)
            .finish()
    }
}
