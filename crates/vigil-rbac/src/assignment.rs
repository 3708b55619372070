//! User-to-role assignments.
//!
//! An assignment ties one user to one role, with provenance and an
//! optional expiry. The document id is the compound `"{user}_{role}"`,
//! so assigning the same role twice overwrites rather than duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_types::{RoleId, UserId};

/// One user-to-role grant.
///
/// A user may hold any number of simultaneous assignments; effective
/// permissions are the union across the ones that are active and
/// unexpired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    /// The user receiving the role.
    pub user_id: UserId,
    /// The role granted.
    pub role_id: RoleId,
    /// Who performed the grant.
    pub assigned_by: UserId,
    /// When the grant was made.
    pub assigned_at: DateTime<Utc>,
    /// Optional expiry; `None` means indefinite.
    pub expires_at: Option<DateTime<Utc>>,
    /// Cleared on removal instead of deleting the document.
    pub is_active: bool,
}

impl RoleAssignment {
    /// Creates an active assignment made now.
    #[must_use]
    pub fn new(
        user_id: UserId,
        role_id: RoleId,
        assigned_by: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            role_id,
            assigned_by,
            assigned_at: Utc::now(),
            expires_at,
            is_active: true,
        }
    }

    /// Compound document id: `"{user}_{role}"`.
    #[must_use]
    pub fn document_id(&self) -> String {
        compound_id(&self.user_id, &self.role_id)
    }

    /// Returns `true` if the assignment currently grants its role:
    /// active and not past its expiry.
    #[must_use]
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

/// Builds the compound assignment document id.
#[must_use]
pub fn compound_id(user_id: &UserId, role_id: &RoleId) -> String {
    format!("{}_{}", user_id.as_str(), role_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment(expires_at: Option<DateTime<Utc>>) -> RoleAssignment {
        RoleAssignment::new(
            UserId::new("u-1"),
            RoleId::new("role_clinician"),
            UserId::new("admin"),
            expires_at,
        )
    }

    #[test]
    fn compound_document_id() {
        let a = assignment(None);
        assert_eq!(a.document_id(), "u-1_role_clinician");
    }

    #[test]
    fn indefinite_assignment_is_effective() {
        let a = assignment(None);
        assert!(a.is_effective(Utc::now()));
    }

    #[test]
    fn expired_assignment_is_not_effective() {
        let now = Utc::now();
        let a = assignment(Some(now - Duration::hours(1)));
        assert!(!a.is_effective(now));

        let future = assignment(Some(now + Duration::hours(1)));
        assert!(future.is_effective(now));
    }

    #[test]
    fn inactive_assignment_is_not_effective() {
        let mut a = assignment(None);
        a.is_active = false;
        assert!(!a.is_effective(Utc::now()));
    }

    #[test]
    fn serde_camel_case_fields() {
        let a = assignment(None);
        let json = serde_json::to_value(&a).expect("serialize");
        assert_eq!(json["userId"], serde_json::json!("u-1"));
        assert_eq!(json["roleId"], serde_json::json!("role_clinician"));
        assert!(json["expiresAt"].is_null());
        assert_eq!(json["isActive"], serde_json::json!(true));
    }
}
