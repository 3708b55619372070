//! The permission catalog service.
//!
//! Owns the in-memory role/permission maps and the per-user assignment
//! cache. Constructed explicitly with its store injected — tests
//! instantiate isolated catalogs instead of sharing process globals.
//!
//! # Caching
//!
//! Role and permission maps are loaded once at bootstrap and updated on
//! catalog writes. The assignment cache is read-through per user with no
//! TTL; [`assign_role`](PermissionCatalog::assign_role),
//! [`remove_role`](PermissionCatalog::remove_role) and
//! [`invalidate_user`](PermissionCatalog::invalidate_user) evict the
//! affected entry synchronously, so a removal is visible on the very
//! next check. Stale reads between an out-of-band store write and the
//! explicit invalidation are the accepted trade-off.

use crate::assignment::{compound_id, RoleAssignment};
use crate::permission::{Condition, Permission, PermissionDoc};
use crate::role::{builtin_permissions, builtin_roles, Role};
use crate::RbacError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use vigil_store::{collections, BatchWrite, DocumentStore, Query};
use vigil_types::{PermissionId, RoleId, UserId};

/// Result of a permission check.
///
/// Denials are values, not errors — callers branch without `match`-ing
/// on error types, and the denial reason feeds the decision
/// justification verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    /// The permission is granted through the named role.
    Granted {
        /// First role (in assignment order) that satisfied the check.
        via_role: RoleId,
    },
    /// The permission is not granted.
    Denied {
        /// Human-readable reason (no internal detail).
        reason: String,
    },
}

impl PermissionCheck {
    /// Returns `true` if the check granted the permission.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// Returns the denial reason, if denied.
    #[must_use]
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            Self::Granted { .. } => None,
            Self::Denied { reason } => Some(reason),
        }
    }

    fn denied(reason: &str) -> Self {
        Self::Denied {
            reason: reason.to_string(),
        }
    }
}

/// In-memory cache of role and permission definitions with per-user
/// assignment resolution.
pub struct PermissionCatalog {
    store: Arc<dyn DocumentStore>,
    permissions: RwLock<HashMap<PermissionId, Permission>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    /// Per-user assignment cache; no TTL, explicit invalidation only.
    assignments: RwLock<HashMap<UserId, Vec<RoleAssignment>>>,
}

impl PermissionCatalog {
    /// Creates a catalog over the given store. Call
    /// [`load_or_bootstrap`](Self::load_or_bootstrap) before checking
    /// permissions.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            permissions: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds the builtin catalog exactly once, then loads both
    /// collections into memory.
    ///
    /// Idempotent: a non-empty `permissions` collection means a previous
    /// bootstrap (or an administrator) already seeded the catalog, and
    /// seeding is skipped. The seed itself is one atomic batch, so a
    /// half-written catalog cannot be observed.
    pub async fn load_or_bootstrap(&self) -> Result<(), RbacError> {
        let existing = self.store.count(collections::PERMISSIONS).await?;
        if existing == 0 {
            let mut writes = Vec::new();
            for permission in builtin_permissions() {
                writes.push(BatchWrite::set(
                    collections::PERMISSIONS,
                    permission.id.as_str(),
                    serde_json::to_value(PermissionDoc::from(&permission))?,
                ));
            }
            for role in builtin_roles() {
                writes.push(BatchWrite::set(
                    collections::ROLES,
                    role.id.as_str(),
                    serde_json::to_value(&role)?,
                ));
            }
            self.store.write_batch(writes).await?;
            info!("seeded builtin permission catalog");
        }
        self.load().await
    }

    /// Loads both collections into the in-memory maps, replacing any
    /// previous content.
    async fn load(&self) -> Result<(), RbacError> {
        let permission_docs = self
            .store
            .query(collections::PERMISSIONS, &Query::new())
            .await?;
        let role_docs = self.store.query(collections::ROLES, &Query::new()).await?;

        let mut permissions = HashMap::new();
        for doc in permission_docs {
            let parsed: PermissionDoc = serde_json::from_value(doc)?;
            let permission = Permission::from(parsed);
            permissions.insert(permission.id.clone(), permission);
        }

        let mut roles = HashMap::new();
        for doc in role_docs {
            let role: Role = serde_json::from_value(doc)?;
            roles.insert(role.id.clone(), role);
        }

        debug!(
            permissions = permissions.len(),
            roles = roles.len(),
            "permission catalog loaded"
        );
        *self.permissions.write() = permissions;
        *self.roles.write() = roles;
        Ok(())
    }

    /// Attaches a predicate condition to a loaded permission.
    ///
    /// Predicates cannot round-trip through the document store, so
    /// embedders register them after
    /// [`load_or_bootstrap`](Self::load_or_bootstrap).
    pub fn register_predicate(
        &self,
        permission_id: &PermissionId,
        key: impl Into<String>,
        f: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Result<(), RbacError> {
        let mut permissions = self.permissions.write();
        let permission = permissions
            .get_mut(permission_id)
            .ok_or_else(|| RbacError::UnknownPermission(permission_id.clone()))?;
        permission
            .conditions
            .insert(key.into(), Condition::predicate(f));
        Ok(())
    }

    /// Checks whether the user holds the permission.
    ///
    /// Resolves the user's effective assignments (cached), unions their
    /// role permission sets, and evaluates any conditions against
    /// `context`. A role whose conditions fail is skipped, not a deny —
    /// another role may still grant the permission.
    pub async fn has_permission(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        context: &Map<String, Value>,
    ) -> Result<PermissionCheck, RbacError> {
        if self.roles.read().is_empty() {
            return Err(RbacError::NotLoaded);
        }

        let now = Utc::now();
        let assignments = self.assignments_for(user_id).await?;
        let effective: Vec<&RoleAssignment> = assignments
            .iter()
            .filter(|a| a.is_effective(now))
            .collect();

        if effective.is_empty() {
            debug!(user = %user_id, permission = %permission_id, "denied: no roles assigned");
            return Ok(PermissionCheck::denied("no roles assigned"));
        }

        let roles = self.roles.read();
        let permissions = self.permissions.read();
        for assignment in effective {
            let Some(role) = roles.get(&assignment.role_id) else {
                continue;
            };
            if !role.is_active || !role.grants(permission_id) {
                continue;
            }
            let Some(permission) = permissions.get(permission_id) else {
                continue;
            };
            if !permission.is_active {
                continue;
            }
            if !permission.conditions_satisfied(context) {
                // This role's grant is conditioned away; keep looking.
                debug!(
                    user = %user_id,
                    permission = %permission_id,
                    role = %role.id,
                    "conditions unsatisfied, skipping role grant"
                );
                continue;
            }
            return Ok(PermissionCheck::Granted {
                via_role: role.id.clone(),
            });
        }

        debug!(user = %user_id, permission = %permission_id, "denied: not in user roles");
        Ok(PermissionCheck::denied("permission not found in user roles"))
    }

    /// Grants a role to a user.
    ///
    /// # Errors
    ///
    /// [`RbacError::InvalidRole`] if the role is unknown or deactivated;
    /// store faults propagate after being logged.
    pub async fn assign_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        assigned_by: &UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), RbacError> {
        self.require_active_role(role_id)?;

        let assignment = RoleAssignment::new(
            user_id.clone(),
            role_id.clone(),
            assigned_by.clone(),
            expires_at,
        );
        let doc = serde_json::to_value(&assignment)?;
        self.store
            .put(collections::USER_ROLES, &assignment.document_id(), doc)
            .await
            .map_err(|e| {
                error!(user = %user_id, role = %role_id, error = %e, "role assignment write failed");
                e
            })?;

        self.invalidate_user(user_id);
        info!(user = %user_id, role = %role_id, by = %assigned_by, "role assigned");
        Ok(())
    }

    /// Removes a role from a user by deactivating the assignment
    /// document (history is preserved).
    pub async fn remove_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<(), RbacError> {
        self.require_known_role(role_id)?;

        let doc_id = compound_id(user_id, role_id);
        let Some(doc) = self.store.get(collections::USER_ROLES, &doc_id).await? else {
            return Err(RbacError::Store(vigil_store::StoreError::not_found(
                collections::USER_ROLES,
                doc_id,
            )));
        };
        let mut assignment: RoleAssignment = serde_json::from_value(doc)?;
        assignment.is_active = false;
        self.store
            .put(
                collections::USER_ROLES,
                &doc_id,
                serde_json::to_value(&assignment)?,
            )
            .await
            .map_err(|e| {
                error!(user = %user_id, role = %role_id, error = %e, "role removal write failed");
                e
            })?;

        self.invalidate_user(user_id);
        info!(user = %user_id, role = %role_id, "role removed");
        Ok(())
    }

    /// Adds a custom role at runtime and makes it assignable
    /// immediately.
    pub async fn add_role(&self, role: Role) -> Result<(), RbacError> {
        self.store
            .put(
                collections::ROLES,
                role.id.as_str(),
                serde_json::to_value(&role)?,
            )
            .await?;
        self.roles.write().insert(role.id.clone(), role);
        Ok(())
    }

    /// Deactivates a role; existing assignments stop granting on the
    /// next check.
    pub async fn deactivate_role(&self, role_id: &RoleId) -> Result<(), RbacError> {
        let mut role = {
            let roles = self.roles.read();
            roles
                .get(role_id)
                .cloned()
                .ok_or_else(|| RbacError::InvalidRole(role_id.clone()))?
        };
        role.is_active = false;
        self.store
            .put(
                collections::ROLES,
                role.id.as_str(),
                serde_json::to_value(&role)?,
            )
            .await?;
        self.roles.write().insert(role.id.clone(), role);
        Ok(())
    }

    /// Deactivates a permission; roles keep listing it but checks stop
    /// granting it.
    pub async fn deactivate_permission(
        &self,
        permission_id: &PermissionId,
    ) -> Result<(), RbacError> {
        let mut permission = {
            let permissions = self.permissions.read();
            permissions
                .get(permission_id)
                .cloned()
                .ok_or_else(|| RbacError::UnknownPermission(permission_id.clone()))?
        };
        permission.is_active = false;
        self.store
            .put(
                collections::PERMISSIONS,
                permission.id.as_str(),
                serde_json::to_value(PermissionDoc::from(&permission))?,
            )
            .await?;
        self.permissions
            .write()
            .insert(permission.id.clone(), permission);
        Ok(())
    }

    /// Evicts one user's cached assignments.
    pub fn invalidate_user(&self, user_id: &UserId) {
        if self.assignments.write().remove(user_id).is_some() {
            debug!(user = %user_id, "assignment cache invalidated");
        }
    }

    /// Read-through lookup of a user's active assignments.
    async fn assignments_for(&self, user_id: &UserId) -> Result<Vec<RoleAssignment>, RbacError> {
        if let Some(cached) = self.assignments.read().get(user_id) {
            return Ok(cached.clone());
        }

        let query = Query::new()
            .filter_eq("userId", user_id.as_str())
            .filter_eq("isActive", true);
        let docs = self.store.query(collections::USER_ROLES, &query).await?;
        let assignments = docs
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<RoleAssignment>, _>>()?;

        self.assignments
            .write()
            .insert(user_id.clone(), assignments.clone());
        Ok(assignments)
    }

    fn require_active_role(&self, role_id: &RoleId) -> Result<(), RbacError> {
        let roles = self.roles.read();
        match roles.get(role_id) {
            Some(role) if role.is_active => Ok(()),
            _ => Err(RbacError::InvalidRole(role_id.clone())),
        }
    }

    fn require_known_role(&self, role_id: &RoleId) -> Result<(), RbacError> {
        if self.roles.read().contains_key(role_id) {
            Ok(())
        } else {
            Err(RbacError::InvalidRole(role_id.clone()))
        }
    }
}

impl std::fmt::Debug for PermissionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCatalog")
            .field("permissions", &self.permissions.read().len())
            .field("roles", &self.roles.read().len())
            .field("cached_users", &self.assignments.read().len())
            .finish()
    }
}
