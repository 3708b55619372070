//! Identifier types for the vigil core.
//!
//! Two families:
//!
//! - **Addressed ids** wrap `String` — they name documents whose ids are
//!   chosen by an external system or administrator (`UserId`, `RoleId`,
//!   `PatientId`, scope ids). Role assignments use the compound form
//!   `"{user}_{role}"` as their document id.
//! - **Generated ids** wrap `Uuid` (v4) — records this core creates
//!   itself (`AuditEntryId`, `ViolationId`) and request tracing ids
//!   (`CorrelationId`, `RequestId`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new id with a random UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the inner UUID.
            #[must_use]
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

string_id! {
    /// Identifier for a user (the requesting actor).
    UserId, "user"
}

string_id! {
    /// Identifier for a role in the catalog.
    ///
    /// Builtin roles use stable ids (`role_clinician`, ...); custom roles
    /// may use any unique string.
    RoleId, "role"
}

string_id! {
    /// Identifier for a patient (the data subject).
    PatientId, "patient"
}

string_id! {
    /// Identifier for a patient consent record.
    ConsentId, "consent"
}

string_id! {
    /// Identifier for a care facility.
    FacilityId, "facility"
}

string_id! {
    /// Identifier for a care provider.
    ProviderId, "provider"
}

string_id! {
    /// Identifier for a clinical service.
    ServiceId, "service"
}

uuid_id! {
    /// Identifier for a persisted audit log entry.
    AuditEntryId, "audit"
}

uuid_id! {
    /// Identifier for a persisted compliance violation.
    ViolationId, "violation"
}

uuid_id! {
    /// Correlates all records emitted while serving one logical operation.
    CorrelationId, "corr"
}

uuid_id! {
    /// Identifier for one inbound request.
    RequestId, "req"
}

/// Identifier for a permission in `resource:action` form.
///
/// The two halves are addressable separately for condition evaluation and
/// display, but the id as a whole is the unit of grant and lookup.
///
/// # Example
///
/// ```
/// use vigil_types::PermissionId;
///
/// let read = PermissionId::new("patient", "read");
/// assert_eq!(read.as_str(), "patient:read");
/// assert_eq!(read.resource(), "patient");
/// assert_eq!(read.action(), "read");
///
/// let parsed = PermissionId::parse("record:write").unwrap();
/// assert_eq!(parsed, PermissionId::new("record", "write"));
/// assert!(PermissionId::parse("no-separator").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(String);

impl PermissionId {
    /// Creates a permission id from a resource and an action.
    #[must_use]
    pub fn new(resource: &str, action: &str) -> Self {
        Self(format!("{resource}:{action}"))
    }

    /// Parses a `resource:action` string.
    ///
    /// Returns `None` if the separator is missing or either half is empty.
    /// Ids without a separator (e.g. `emergency_access`) are standalone
    /// grants; use [`standalone`](Self::standalone) for those.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (resource, action) = s.split_once(':')?;
        if resource.is_empty() || action.is_empty() {
            return None;
        }
        Some(Self(s.to_string()))
    }

    /// Creates a standalone permission id with no resource half
    /// (e.g. `emergency_access`, `break_glass`).
    #[must_use]
    pub fn standalone(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the full `resource:action` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the resource half, or the whole id for standalone grants.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(r, _)| r)
    }

    /// Returns the action half, or the whole id for standalone grants.
    #[must_use]
    pub fn action(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, a)| a)
    }
}

impl From<&str> for PermissionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
