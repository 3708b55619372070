//! Role-based access control for the vigil core.
//!
//! Permissions are granted to roles, roles to users; a user's effective
//! permission set is the union across all active, non-expired role
//! assignments.
//!
//! ```text
//! PermissionCatalog
//!     │  load_or_bootstrap()         ← seeds the builtin catalog once
//!     │  has_permission(user, p, ctx)
//!     │       │
//!     │       ├── assignments_for(user)   ← per-user cache, no TTL,
//!     │       │                             invalidated on change
//!     │       └── role permission union + condition evaluation
//!     │
//!     └── assign_role / remove_role  ← write + invalidate
//! ```
//!
//! # Conditions
//!
//! A permission may declare conditions — named requirements evaluated
//! against the request context. [`Condition`] is a closed variant:
//! a stored literal ([`Condition::Equals`]) or a code-registered
//! predicate ([`Condition::Predicate`]), evaluated uniformly. One failed
//! condition skips that role's grant; another role may still satisfy
//! the check.
//!
//! # Error discipline
//!
//! This module never degrades silently: store faults are logged and
//! propagated to the caller. (The audit pipeline is the one place in the
//! workspace that intentionally swallows write failures.)

pub mod assignment;
pub mod catalog;
pub mod error;
pub mod permission;
pub mod role;

pub use assignment::RoleAssignment;
pub use catalog::{PermissionCatalog, PermissionCheck};
pub use error::RbacError;
pub use permission::{Condition, Permission};
pub use role::{builtin_permissions, builtin_roles, Role};
