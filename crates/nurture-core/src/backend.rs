// ── Collaborator seams ──
//
// The resolver talks to the outside world only through these traits.
// `SupabaseBackend` implements the remote ones against the hosted
// service; tests substitute in-memory fakes.

use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{AuthError, CoreError};
use crate::model::{FamilyProfile, Identity, PersistedIdentity, Profile, UserId};

/// A successful credential check.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub identity: Identity,
    /// Name recorded at signup, if any.
    pub display_name: Option<String>,
    /// Token subsequent backend calls run under; persisted with the session.
    pub access_token: Option<SecretString>,
    /// Renews `access_token` after it expires; persisted with the session.
    pub refresh_token: Option<SecretString>,
}

/// Remote identity and profile operations.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Verify credentials. Only `InvalidCredentials` and
    /// `SubscriptionExpired` are meant for the user.
    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthenticatedIdentity, AuthError>;

    /// `Ok(None)` means "definitively no record", which allows falling
    /// back to the email lookup. Errors never do.
    async fn lookup_profile_by_identity(&self, id: &UserId) -> Result<Option<Profile>, CoreError>;

    async fn lookup_profile_by_email(&self, email: &str) -> Result<Option<Profile>, CoreError>;

    async fn complete_profile(
        &self,
        identity: &Identity,
        profile: &FamilyProfile,
    ) -> Result<(), CoreError>;

    async fn sign_out(&self) -> Result<(), CoreError>;

    /// Re-install credentials from a persisted session so lookups run as
    /// that user after a restart.
    fn restore_session(&self, persisted: &PersistedIdentity);

    /// Exchange the persisted refresh token for new credentials. Returns
    /// the record with the new tokens; installing them is left to
    /// [`restore_session`](Self::restore_session).
    ///
    /// Fails with `SessionExpired` when there is no refresh token or the
    /// service no longer accepts it.
    async fn refresh_session(
        &self,
        persisted: &PersistedIdentity,
    ) -> Result<PersistedIdentity, CoreError>;

    /// Email a password-reset link.
    async fn request_password_reset(&self, email: &str) -> Result<(), CoreError>;

    /// Set a new password with the token from a reset link.
    async fn complete_password_reset(
        &self,
        recovery_token: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), CoreError>;
}

/// Local storage for the session left by the last successful login.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedIdentity>, CoreError>;
    fn persist(&self, record: &PersistedIdentity) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

// ── MemorySessionStore ───────────────────────────────────────────────

/// Process-local store. Used by tests and by one-shot commands that
/// should not leave a session behind.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<PersistedIdentity>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PersistedIdentity) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<PersistedIdentity>, CoreError> {
        Ok(self.record.lock().expect("session store lock poisoned").clone())
    }

    fn persist(&self, record: &PersistedIdentity) -> Result<(), CoreError> {
        *self.record.lock().expect("session store lock poisoned") = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.record.lock().expect("session store lock poisoned") = None;
        Ok(())
    }
}
