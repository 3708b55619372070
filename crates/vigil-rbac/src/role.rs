//! Role definitions and the builtin catalog.
//!
//! Six builtin roles form the fixed catalog seeded at bootstrap; custom
//! roles may be added at runtime. A role's `priority` breaks display
//! ambiguity only — permission union across a user's roles is what
//! decides access.

use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use vigil_types::{PermissionId, RoleId};

/// A named set of permissions grantable to users.
///
/// Never hard-deleted; deactivation preserves the audit trail of past
/// grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Human-readable name.
    pub name: String,
    /// Permission ids this role grants.
    pub permissions: Vec<PermissionId>,
    /// Informational precedence; higher wins in display ambiguity.
    pub priority: i32,
    /// Whether the role can currently be assigned.
    pub is_active: bool,
}

impl Role {
    /// Creates an active role.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        permissions: Vec<PermissionId>,
        priority: i32,
    ) -> Self {
        Self {
            id: RoleId::new(id),
            name: name.into(),
            permissions,
            priority,
            is_active: true,
        }
    }

    /// Returns `true` if this role grants the permission.
    #[must_use]
    pub fn grants(&self, permission: &PermissionId) -> bool {
        self.permissions.contains(permission)
    }
}

fn p(resource: &str, action: &str) -> PermissionId {
    PermissionId::new(resource, action)
}

/// The fixed permission list seeded at bootstrap.
#[must_use]
pub fn builtin_permissions() -> Vec<Permission> {
    vec![
        Permission::new(p("patient", "read"), "Read patient demographics and records"),
        Permission::new(p("patient", "write"), "Create and update patient records"),
        Permission::new(p("record", "read"), "Read medical record entries"),
        Permission::new(p("record", "write"), "Create and update medical record entries"),
        Permission::new(p("consent", "read"), "Read patient consent records"),
        Permission::new(p("consent", "write"), "Grant and revoke patient consents"),
        Permission::new(p("audit", "read"), "Read the audit log"),
        Permission::new(p("role", "manage"), "Create roles and manage assignments"),
        Permission::new(p("facility", "manage"), "Manage facility configuration"),
        Permission::new(
            PermissionId::standalone("emergency_access"),
            "Bypass consent matching in a clinical emergency",
        ),
        Permission::new(
            PermissionId::standalone("break_glass"),
            "Last-resort privileged access; always critical risk",
        ),
    ]
}

/// The six builtin roles seeded at bootstrap.
#[must_use]
pub fn builtin_roles() -> Vec<Role> {
    vec![
        Role::new(
            "role_system_admin",
            "System Administrator",
            builtin_permissions().into_iter().map(|perm| perm.id).collect(),
            100,
        ),
        Role::new(
            "role_compliance_officer",
            "Compliance Officer",
            vec![
                p("audit", "read"),
                p("consent", "read"),
                p("record", "read"),
                p("patient", "read"),
            ],
            90,
        ),
        Role::new(
            "role_facility_admin",
            "Facility Administrator",
            vec![
                p("facility", "manage"),
                p("role", "manage"),
                p("patient", "read"),
                p("record", "read"),
                p("consent", "read"),
            ],
            80,
        ),
        Role::new(
            "role_clinician",
            "Clinician",
            vec![
                p("patient", "read"),
                p("patient", "write"),
                p("record", "read"),
                p("record", "write"),
                p("consent", "read"),
                PermissionId::standalone("emergency_access"),
            ],
            70,
        ),
        Role::new(
            "role_clinic_staff",
            "Clinic Staff",
            vec![p("patient", "read"), p("record", "read"), p("consent", "read")],
            50,
        ),
        Role::new(
            "role_patient",
            "Patient",
            vec![p("consent", "read"), p("consent", "write"), p("record", "read")],
            10,
        ),
    ]
}
