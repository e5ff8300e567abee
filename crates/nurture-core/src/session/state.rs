// ── SessionState ──
//
// Fields are private: every value is built through a constructor that
// upholds the invariants below, so no reader can observe a state that
// violates them.
//
//   recovery_mode            => no identity, role or setup facts
//   identity == None         => role Unknown, setup Unknown
//   role == Admin            => setup Complete
//   subscription_expired set => identity == None

use serde::Serialize;

use crate::model::{Identity, Role, SetupStatus};

/// Shown on the login screen after an authentication attempt was refused
/// because the subscription lapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionExpired {
    pub renewal_url: Option<String>,
}

/// Everything the router needs to pick a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    identity: Option<Identity>,
    role: Role,
    setup_status: SetupStatus,
    recovery_mode: bool,
    subscription_expired: Option<SubscriptionExpired>,
    loading: bool,
}

impl SessionState {
    /// The single state that exists before bootstrap completes.
    pub fn initial() -> Self {
        Self {
            loading: true,
            ..Self::empty()
        }
    }

    /// Signed out, nothing pending.
    pub fn empty() -> Self {
        Self {
            identity: None,
            role: Role::Unknown,
            setup_status: SetupStatus::Unknown,
            recovery_mode: false,
            subscription_expired: None,
            loading: false,
        }
    }

    /// Entered through a password-reset link.
    pub fn recovery() -> Self {
        Self {
            recovery_mode: true,
            ..Self::empty()
        }
    }

    /// A signed-in user. Admins never need profile setup.
    pub fn authenticated(identity: Identity, role: Role, setup_status: SetupStatus) -> Self {
        let setup_status = if role.is_admin() {
            SetupStatus::Complete
        } else {
            setup_status
        };
        Self {
            identity: Some(identity),
            role,
            setup_status,
            ..Self::empty()
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn setup_status(&self) -> SetupStatus {
        self.setup_status
    }

    pub fn is_recovery_mode(&self) -> bool {
        self.recovery_mode
    }

    pub fn subscription_expired(&self) -> Option<&SubscriptionExpired> {
        self.subscription_expired.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    // ── Crate-internal transitions (used by the reducer) ─────────────

    /// Same state with setup marked complete. No-op without an identity.
    pub(crate) fn with_setup_complete(&self) -> Self {
        if self.identity.is_none() {
            return self.clone();
        }
        Self {
            setup_status: SetupStatus::Complete,
            ..self.clone()
        }
    }

    /// Same state with the expiry interstitial set. No-op while signed in
    /// or in recovery mode.
    pub(crate) fn with_subscription_expired(&self, renewal_url: Option<String>) -> Self {
        if self.identity.is_some() || self.recovery_mode {
            return self.clone();
        }
        Self {
            subscription_expired: Some(SubscriptionExpired { renewal_url }),
            loading: false,
            ..self.clone()
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_always_complete() {
        let s = SessionState::authenticated(
            Identity::new("u", "a@b.c"),
            Role::Admin,
            SetupStatus::NeedsProfileSetup,
        );
        assert_eq!(s.setup_status(), SetupStatus::Complete);
    }

    #[test]
    fn expiry_interstitial_requires_signed_out_state() {
        let signed_in =
            SessionState::authenticated(Identity::new("u", "a@b.c"), Role::User, SetupStatus::Complete);
        assert_eq!(signed_in.with_subscription_expired(None), signed_in);

        let out = SessionState::empty().with_subscription_expired(Some("https://x/renew".into()));
        assert_eq!(
            out.subscription_expired().and_then(|e| e.renewal_url.as_deref()),
            Some("https://x/renew")
        );
    }

    #[test]
    fn recovery_carries_nothing_else() {
        let s = SessionState::recovery();
        assert!(s.is_recovery_mode());
        assert!(s.identity().is_none());
        assert!(!s.is_loading());
        assert_eq!(s.with_subscription_expired(None), s);
    }
}
