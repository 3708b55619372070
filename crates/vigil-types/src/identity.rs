//! Identity collaborator interface.
//!
//! The identity provider is an external system (the source deployment
//! uses a hosted auth service). This core only needs two things from it:
//! who is currently signed in, and a way to hear about sign-in/sign-out.
//!
//! # Why a trait here, not a global
//!
//! The source accessed the current user through an ambient global and
//! null-checked it at every call site. Here the provider is injected at
//! construction and consumers branch on an explicit `Option` — tests
//! swap in a [`StaticIdentity`] with whatever state they need.
//!
//! ```text
//! IdentityProvider trait (vigil-types)   ← abstract, no auth logic
//!          │
//!          ├── StaticIdentity (THIS MODULE)    ← embedding + tests
//!          └── (deployment) remote auth bridge
//! ```

use crate::UserId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// An authenticated actor as reported by the identity provider.
///
/// Identity only — no permissions. The RBAC layer decides what the
/// principal may do; the audit layer gates on `email_verified`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPrincipal {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Email address on record.
    pub email: String,
    /// Whether the provider has verified the email address.
    pub email_verified: bool,
}

impl AuthPrincipal {
    /// Creates a principal with a verified email.
    #[must_use]
    pub fn verified(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: email.into(),
            email_verified: true,
        }
    }

    /// Creates a principal whose email is not yet verified.
    #[must_use]
    pub fn unverified(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: email.into(),
            email_verified: false,
        }
    }
}

impl std::fmt::Display for AuthPrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.email_verified {
            "verified"
        } else {
            "unverified"
        };
        write!(f, "{}@{}", self.user_id, state)
    }
}

/// Listener invoked on sign-in and sign-out.
///
/// Receives the new state: `Some` on sign-in, `None` on sign-out.
pub type IdentityListener = Box<dyn Fn(Option<&AuthPrincipal>) + Send + Sync>;

/// Identity collaborator: answers "who is signed in right now".
///
/// Implementations must be thread-safe; the audit pipeline calls
/// [`current`](Self::current) from enqueue paths on arbitrary tasks.
pub trait IdentityProvider: Send + Sync {
    /// Returns the currently authenticated principal, if any.
    fn current(&self) -> Option<AuthPrincipal>;

    /// Registers a listener invoked on every sign-in and sign-out.
    fn subscribe(&self, listener: IdentityListener);
}

/// In-process identity provider with mutable state.
///
/// Used directly in tests and by embedders that already know the signed-in
/// principal; a deployment bridges its auth service to this interface.
///
/// # Example
///
/// ```
/// use vigil_types::{AuthPrincipal, IdentityProvider, StaticIdentity};
///
/// let identity = StaticIdentity::signed_out();
/// assert!(identity.current().is_none());
///
/// identity.sign_in(AuthPrincipal::verified("u-1", "doc@clinic.example"));
/// assert!(identity.current().is_some());
///
/// identity.sign_out();
/// assert!(identity.current().is_none());
/// ```
#[derive(Default)]
pub struct StaticIdentity {
    current: RwLock<Option<AuthPrincipal>>,
    listeners: RwLock<Vec<IdentityListener>>,
}

impl StaticIdentity {
    /// Creates a provider with nobody signed in.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Creates a provider with the given principal already signed in.
    #[must_use]
    pub fn signed_in(principal: AuthPrincipal) -> Self {
        Self {
            current: RwLock::new(Some(principal)),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Signs a principal in and notifies listeners.
    pub fn sign_in(&self, principal: AuthPrincipal) {
        *self.current.write() = Some(principal.clone());
        for listener in self.listeners.read().iter() {
            listener(Some(&principal));
        }
    }

    /// Signs the current principal out and notifies listeners.
    pub fn sign_out(&self) {
        *self.current.write() = None;
        for listener in self.listeners.read().iter() {
            listener(None);
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<AuthPrincipal> {
        self.current.read().clone()
    }

    fn subscribe(&self, listener: IdentityListener) {
        self.listeners.write().push(listener);
    }
}

impl std::fmt::Debug for StaticIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticIdentity")
            .field("current", &*self.current.read())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn signed_out_by_default() {
        let identity = StaticIdentity::signed_out();
        assert!(identity.current().is_none());
    }

    #[test]
    fn sign_in_and_out() {
        let identity = StaticIdentity::signed_out();
        identity.sign_in(AuthPrincipal::verified("u-1", "a@b.example"));

        let current = identity.current().expect("signed in");
        assert_eq!(current.user_id.as_str(), "u-1");
        assert!(current.email_verified);

        identity.sign_out();
        assert!(identity.current().is_none());
    }

    #[test]
    fn listeners_hear_both_transitions() {
        let identity = StaticIdentity::signed_out();
        let sign_ins = Arc::new(AtomicUsize::new(0));
        let sign_outs = Arc::new(AtomicUsize::new(0));

        let (ins, outs) = (Arc::clone(&sign_ins), Arc::clone(&sign_outs));
        identity.subscribe(Box::new(move |state| {
            if state.is_some() {
                ins.fetch_add(1, Ordering::SeqCst);
            } else {
                outs.fetch_add(1, Ordering::SeqCst);
            }
        }));

        identity.sign_in(AuthPrincipal::unverified("u-1", "a@b.example"));
        identity.sign_out();
        identity.sign_in(AuthPrincipal::verified("u-2", "c@d.example"));

        assert_eq!(sign_ins.load(Ordering::SeqCst), 2);
        assert_eq!(sign_outs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn display_shows_verification_state() {
        let verified = AuthPrincipal::verified("u-1", "a@b.example");
        assert!(format!("{verified}").contains("verified"));

        let unverified = AuthPrincipal::unverified("u-2", "c@d.example");
        assert!(format!("{unverified}").contains("unverified"));
    }
}
