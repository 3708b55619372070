//! Permission definitions and condition evaluation.
//!
//! A [`Permission`] is an operation identifier (`resource:action`) with
//! an optional set of [`Condition`]s evaluated against the request
//! context. Conditions are conjunctive: every declared key must be
//! present in the context and satisfied.
//!
//! # The Condition variant
//!
//! The source system allowed a condition to be either a literal or a
//! bare function, discovered by runtime type inspection. Here that is a
//! closed tagged variant evaluated uniformly:
//!
//! - [`Condition::Equals`] — exact JSON equality; persists to and loads
//!   from the document store.
//! - [`Condition::Predicate`] — an arbitrary check registered in code;
//!   never persisted (documents carry only the `Equals` form).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use vigil_types::PermissionId;

/// Predicate function over a context value.
pub type ConditionFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// One requirement a request context must satisfy.
#[derive(Clone)]
pub enum Condition {
    /// Context value must equal this literal exactly.
    Equals(Value),
    /// Context value must satisfy this predicate.
    Predicate(ConditionFn),
}

impl Condition {
    /// Creates an equality condition.
    #[must_use]
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Equals(value.into())
    }

    /// Creates a predicate condition.
    #[must_use]
    pub fn predicate(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Evaluates the condition against a context value.
    ///
    /// `None` (key absent from the context) never satisfies a condition.
    #[must_use]
    pub fn evaluate(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Self::Equals(expected) => actual == expected,
            Self::Predicate(f) => f(actual),
        }
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A grantable operation in the catalog.
///
/// Immutable once created except for deactivation; deactivated
/// permissions stay in the store to preserve audit history.
#[derive(Debug, Clone)]
pub struct Permission {
    /// `resource:action` identifier.
    pub id: PermissionId,
    /// Free-text description.
    pub description: String,
    /// Conjunctive conditions keyed by context field.
    pub conditions: BTreeMap<String, Condition>,
    /// Whether the permission can currently be granted.
    pub is_active: bool,
}

impl Permission {
    /// Creates an active, unconditional permission.
    #[must_use]
    pub fn new(id: PermissionId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            conditions: BTreeMap::new(),
            is_active: true,
        }
    }

    /// Adds a condition (builder style).
    #[must_use]
    pub fn with_condition(mut self, key: impl Into<String>, condition: Condition) -> Self {
        self.conditions.insert(key.into(), condition);
        self
    }

    /// Returns `true` if every declared condition is satisfied by the
    /// context. A permission with no conditions is always satisfied.
    #[must_use]
    pub fn conditions_satisfied(&self, context: &Map<String, Value>) -> bool {
        self.conditions
            .iter()
            .all(|(key, condition)| condition.evaluate(context.get(key)))
    }
}

/// Store-facing shape of a [`Permission`].
///
/// Only [`Condition::Equals`] survives the round-trip; predicate
/// conditions are registered in code after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDoc {
    /// `resource:action` identifier.
    pub id: PermissionId,
    /// Free-text description.
    pub description: String,
    /// Equality conditions keyed by context field.
    #[serde(default)]
    pub conditions: BTreeMap<String, Value>,
    /// Whether the permission can currently be granted.
    pub is_active: bool,
}

impl From<&Permission> for PermissionDoc {
    fn from(p: &Permission) -> Self {
        let conditions = p
            .conditions
            .iter()
            .filter_map(|(key, condition)| match condition {
                Condition::Equals(v) => Some((key.clone(), v.clone())),
                Condition::Predicate(_) => {
                    tracing::debug!(permission = %p.id, key = %key, "predicate condition not persisted");
                    None
                }
            })
            .collect();
        Self {
            id: p.id.clone(),
            description: p.description.clone(),
            conditions,
            is_active: p.is_active,
        }
    }
}

impl From<PermissionDoc> for Permission {
    fn from(doc: PermissionDoc) -> Self {
        Self {
            id: doc.id,
            description: doc.description,
            conditions: doc
                .conditions
                .into_iter()
                .map(|(key, value)| (key, Condition::Equals(value)))
                .collect(),
            is_active: doc.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn unconditional_permission_always_satisfied() {
        let p = Permission::new(PermissionId::new("patient", "read"), "read patient data");
        assert!(p.conditions_satisfied(&Map::new()));
    }

    #[test]
    fn equals_condition() {
        let p = Permission::new(PermissionId::new("record", "read"), "read records")
            .with_condition("department", Condition::equals("cardiology"));

        assert!(p.conditions_satisfied(&context(&[("department", json!("cardiology"))])));
        assert!(!p.conditions_satisfied(&context(&[("department", json!("oncology"))])));
    }

    #[test]
    fn missing_context_key_fails() {
        let p = Permission::new(PermissionId::new("record", "read"), "read records")
            .with_condition("department", Condition::equals("cardiology"));
        assert!(!p.conditions_satisfied(&Map::new()));
    }

    #[test]
    fn predicate_condition() {
        let p = Permission::new(PermissionId::new("record", "write"), "write records")
            .with_condition(
                "shift_hour",
                Condition::predicate(|v| v.as_u64().is_some_and(|h| (6..22).contains(&h))),
            );

        assert!(p.conditions_satisfied(&context(&[("shift_hour", json!(9))])));
        assert!(!p.conditions_satisfied(&context(&[("shift_hour", json!(23))])));
        assert!(!p.conditions_satisfied(&context(&[("shift_hour", json!("nine"))])));
    }

    #[test]
    fn all_conditions_must_hold() {
        let p = Permission::new(PermissionId::new("record", "read"), "read records")
            .with_condition("department", Condition::equals("cardiology"))
            .with_condition("on_duty", Condition::equals(true));

        assert!(p.conditions_satisfied(&context(&[
            ("department", json!("cardiology")),
            ("on_duty", json!(true)),
        ])));
        assert!(!p.conditions_satisfied(&context(&[
            ("department", json!("cardiology")),
            ("on_duty", json!(false)),
        ])));
    }

    #[test]
    fn doc_roundtrip_keeps_equals_drops_predicates() {
        let p = Permission::new(PermissionId::new("record", "read"), "read records")
            .with_condition("department", Condition::equals("cardiology"))
            .with_condition("custom", Condition::predicate(|_| true));

        let doc = PermissionDoc::from(&p);
        assert_eq!(doc.conditions.len(), 1);
        assert_eq!(doc.conditions["department"], json!("cardiology"));

        let restored = Permission::from(doc);
        assert_eq!(restored.conditions.len(), 1);
        assert!(restored
            .conditions_satisfied(&context(&[("department", json!("cardiology"))])));
    }

    #[test]
    fn doc_serde_uses_camel_case() {
        let p = Permission::new(PermissionId::new("patient", "read"), "read");
        let json = serde_json::to_value(PermissionDoc::from(&p)).expect("serialize");
        assert_eq!(json["isActive"], json!(true));
        assert_eq!(json["id"], json!("patient:read"));
    }
}
