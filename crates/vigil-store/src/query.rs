//! Query predicates for document collections.
//!
//! A [`Query`] is a conjunction of field filters plus optional ordering
//! and a limit — the subset of query shapes the source system's document
//! database supports and the only subset this core relies on:
//!
//! ```
//! use vigil_store::{Direction, Query};
//!
//! let q = Query::new()
//!     .filter_eq("status", "granted")
//!     .filter_eq("patientId", "p-1")
//!     .order_by("createdAt", Direction::Descending)
//!     .limit(10);
//! assert_eq!(q.filters.len(), 2);
//! ```
//!
//! Field paths are top-level document keys. Values compare by JSON type:
//! numbers numerically, strings lexicographically (RFC3339 timestamps
//! order chronologically this way), booleans by equality only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator for a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Field equals value.
    Eq,
    /// Field does not equal value.
    Ne,
    /// Field is strictly greater than value.
    Gt,
    /// Field is greater than or equal to value.
    Gte,
    /// Field is strictly less than value.
    Lt,
    /// Field is less than or equal to value.
    Lte,
}

/// A single field predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Top-level document key.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Value to compare against.
    pub value: Value,
}

impl Filter {
    /// Evaluates this filter against a document.
    ///
    /// A missing field never matches (not even `Ne`), mirroring the
    /// source database's sparse-index behavior.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Gt => compare(actual, &self.value) == Some(std::cmp::Ordering::Greater),
            FilterOp::Gte => matches!(
                compare(actual, &self.value),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            ),
            FilterOp::Lt => compare(actual, &self.value) == Some(std::cmp::Ordering::Less),
            FilterOp::Lte => matches!(
                compare(actual, &self.value),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            ),
        }
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Smallest (oldest) first.
    Ascending,
    /// Largest (newest) first.
    Descending,
}

/// A conjunction of filters with optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Predicates; all must match.
    pub filters: Vec<Filter>,
    /// Optional `(field, direction)` ordering.
    pub order: Option<(String, Direction)>,
    /// Optional maximum number of results.
    pub max_results: Option<usize>,
}

impl Query {
    /// Creates an empty query matching every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    /// Adds a filter with an explicit operator.
    #[must_use]
    pub fn filter(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Sets the result ordering.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((field.into(), direction));
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }

    /// Returns `true` if the document satisfies every filter.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }
}

/// Total-order comparison between two JSON values of the same type.
///
/// Returns `None` for mismatched or unordered types (objects, arrays,
/// null) — range filters simply don't match in that case.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
