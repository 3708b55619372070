//! Unified error interface for the vigil workspace.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so that
//! callers, logs and monitors see one stable vocabulary:
//!
//! - **Machine-readable codes**: `UPPER_SNAKE_CASE`, prefixed per crate
//!   (`STORE_`, `RBAC_`, `CONSENT_`, `AUDIT_`, `ENGINE_`)
//! - **Recoverability**: whether retrying the operation may succeed
//!
//! # Recoverability
//!
//! An error is **recoverable** when the condition is transient — a store
//! backend fault, a timeout. It is **not recoverable** when retrying
//! cannot help: malformed input, a missing document, a denied permission.
//! Deny decisions are never modeled as errors at all (callers branch on
//! the decision value), so "permission denied" errors here mean the
//! *store* refused a write, not that an access decision was negative.

/// Unified error code interface.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**: e.g. `"STORE_UNAVAILABLE"`
/// - **Crate-prefixed**: e.g. `"RBAC_INVALID_ROLE"`, `"AUDIT_DISABLED"`
/// - **Stable**: codes are an API contract and never change once defined
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows workspace conventions.
///
/// # Checks
///
/// 1. Code is non-empty
/// 2. Code starts with the expected prefix
/// 3. Code is UPPER_SNAKE_CASE
///
/// # Panics
///
/// Panics with a descriptive message if validation fails; intended for
/// use in tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Validates every variant of an error enum at once.
///
/// # Example
///
/// ```
/// use vigil_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum MyError { A, B }
///
/// impl ErrorCode for MyError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "MY_A",
///             Self::B => "MY_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[MyError::A, MyError::B], "MY_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
