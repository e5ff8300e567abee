#![allow(clippy::unwrap_used)]
// Integration tests for `SessionResolver` against an in-memory backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Semaphore;

use nurture_core::{
    AuthError, AuthenticatedIdentity, ChildDetails, CoreError, FamilyProfile, Identity,
    IdentityBackend, MemorySessionStore, Navigation, PersistedIdentity, Profile, Role, Screen,
    SessionResolver, SessionStore, UserId,
};

// ── Fake backend ────────────────────────────────────────────────────

struct Account {
    id: String,
    password: String,
    /// `Some(url)` when the subscription has lapsed.
    expired: Option<Option<String>>,
}

#[derive(Default)]
struct FakeBackend {
    accounts: Mutex<HashMap<String, Account>>,
    by_id: Mutex<HashMap<String, Profile>>,
    by_email: Mutex<HashMap<String, Profile>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    fail_lookups: AtomicBool,
    lookups: AtomicUsize,
    sign_outs: AtomicUsize,
    completed: Mutex<Vec<String>>,
    restored: Mutex<Option<String>>,
    /// Accounts whose lookups report an expired session until renewed.
    expired_sessions: Mutex<HashSet<String>>,
    refresh_rejected: AtomicBool,
    refreshes: AtomicUsize,
}

impl FakeBackend {
    fn account(self, email: &str, id: &str, profile: Option<Profile>) -> Self {
        self.accounts.lock().unwrap().insert(
            email.into(),
            Account {
                id: id.into(),
                password: "secret".into(),
                expired: None,
            },
        );
        if let Some(p) = profile {
            self.by_id.lock().unwrap().insert(id.into(), p);
        }
        self
    }

    fn expired(self, email: &str, renewal_url: &str) -> Self {
        self.accounts.lock().unwrap().insert(
            email.into(),
            Account {
                id: "u-expired".into(),
                password: "secret".into(),
                expired: Some(Some(renewal_url.into())),
            },
        );
        self
    }

    /// Lookups for `id` block until `release` adds a permit.
    fn gate(&self, id: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(id.into(), gate.clone());
        gate
    }
}

#[async_trait]
impl IdentityBackend for FakeBackend {
    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let accounts = self.accounts.lock().unwrap();
        let account = accounts.get(email).ok_or(AuthError::InvalidCredentials)?;
        if account.password != password.expose_secret() {
            return Err(AuthError::InvalidCredentials);
        }
        if let Some(renewal_url) = &account.expired {
            return Err(AuthError::SubscriptionExpired {
                renewal_url: renewal_url.clone(),
            });
        }
        Ok(AuthenticatedIdentity {
            identity: Identity::new(account.id.as_str(), email),
            display_name: None,
            access_token: Some(SecretString::from(format!("jwt-{}", account.id))),
            refresh_token: Some(SecretString::from(format!("refresh-{}", account.id))),
        })
    }

    async fn lookup_profile_by_identity(&self, id: &UserId) -> Result<Option<Profile>, CoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(id.as_str()).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        let renewed = self.restored.lock().unwrap().clone() == Some(format!("renewed-{id}"));
        if !renewed && self.expired_sessions.lock().unwrap().contains(id.as_str()) {
            return Err(CoreError::SessionExpired);
        }
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(CoreError::ConnectionFailed {
                url: "fake".into(),
                reason: "offline".into(),
            });
        }
        Ok(self.by_id.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn lookup_profile_by_email(&self, email: &str) -> Result<Option<Profile>, CoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_email.lock().unwrap().get(email).cloned())
    }

    async fn complete_profile(
        &self,
        identity: &Identity,
        profile: &FamilyProfile,
    ) -> Result<(), CoreError> {
        self.completed
            .lock()
            .unwrap()
            .push(identity.id.to_string());
        if let Some(p) = self.by_id.lock().unwrap().get_mut(identity.id.as_str()) {
            p.display_name = Some(profile.full_name.clone());
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn restore_session(&self, persisted: &PersistedIdentity) {
        *self.restored.lock().unwrap() = persisted.access_token.clone();
    }

    async fn refresh_session(
        &self,
        persisted: &PersistedIdentity,
    ) -> Result<PersistedIdentity, CoreError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if persisted.refresh_token.is_none() || self.refresh_rejected.load(Ordering::SeqCst) {
            return Err(CoreError::SessionExpired);
        }
        Ok(PersistedIdentity {
            access_token: Some(format!("renewed-{}", persisted.id)),
            refresh_token: Some("refresh-next".into()),
            ..persisted.clone()
        })
    }

    async fn request_password_reset(&self, _email: &str) -> Result<(), CoreError> {
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        _recovery_token: &SecretString,
        _new_password: &SecretString,
    ) -> Result<(), CoreError> {
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

fn profile(role: Option<Role>, name: Option<&str>, age_days: i64) -> Profile {
    Profile {
        role,
        display_name: name.map(str::to_owned),
        created_at: Some(Utc::now() - Duration::days(age_days)),
    }
}

fn persisted(id: &str, email: &str, role: Role, needs_setup: bool) -> PersistedIdentity {
    PersistedIdentity {
        id: id.into(),
        email: email.into(),
        role,
        full_name: Some("Asha".into()),
        authenticated: true,
        needs_profile_setup: needs_setup,
        login_time: Utc::now(),
        access_token: Some(format!("jwt-{id}")),
        refresh_token: Some(format!("refresh-{id}")),
    }
}

fn family() -> FamilyProfile {
    FamilyProfile {
        full_name: "Asha Rao".into(),
        child: ChildDetails {
            name: "Mira".into(),
            ..ChildDetails::default()
        },
        ..FamilyProfile::default()
    }
}

fn resolver(
    backend: FakeBackend,
    store: MemorySessionStore,
) -> (SessionResolver, Arc<FakeBackend>, Arc<MemorySessionStore>) {
    let backend = Arc::new(backend);
    let store = Arc::new(store);
    (
        SessionResolver::new(backend.clone(), store.clone()),
        backend,
        store,
    )
}

// ── Bootstrap ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_bootstrap_without_session_shows_login() {
    let (resolver, _, _) = resolver(FakeBackend::default(), MemorySessionStore::new());
    assert_eq!(resolver.screen(), Screen::Loading);

    let state = resolver.start(&Navigation::none()).await;
    assert!(!state.is_loading());
    assert_eq!(resolver.screen(), Screen::Login);
}

#[tokio::test]
async fn test_recovery_link_skips_lookups() {
    let store = MemorySessionStore::with_record(persisted("u-1", "a@b.co", Role::Admin, false));
    let (resolver, backend, _) = resolver(FakeBackend::default(), store);

    let nav = Navigation::parse("https://app.example.com/?type=recovery&token_hash=abc");
    resolver.start(&nav).await;
    resolver.wait_for_refresh().await;

    assert_eq!(resolver.screen(), Screen::PasswordReset);
    assert_eq!(backend.lookups.load(Ordering::SeqCst), 0);
    assert!(backend.restored.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_persisted_session_is_provisional_until_refresh() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::Admin), Some("Asha Rao"), 90)),
    );
    let gate = backend.gate("u-1");
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, false));
    let (resolver, backend, _) = resolver(backend, store);

    resolver.start(&Navigation::none()).await;
    assert_eq!(resolver.screen(), Screen::UserDashboard);
    assert_eq!(backend.restored.lock().unwrap().as_deref(), Some("jwt-u-1"));

    gate.add_permits(1);
    resolver.wait_for_refresh().await;
    assert_eq!(resolver.screen(), Screen::AdminDashboard);
}

#[tokio::test]
async fn test_failed_refresh_keeps_provisional_values() {
    let backend = FakeBackend::default();
    backend.fail_lookups.store(true, Ordering::SeqCst);
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, true));
    let (resolver, _, _) = resolver(backend, store);

    resolver.start(&Navigation::none()).await;
    resolver.wait_for_refresh().await;
    assert_eq!(resolver.screen(), Screen::ProfileSetup);
    assert_eq!(resolver.snapshot().role(), Role::User);
}

#[tokio::test]
async fn test_refresh_without_record_keeps_provisional_role() {
    let store =
        MemorySessionStore::with_record(persisted("u-9", "gone@example.com", Role::Admin, false));
    let (resolver, _, _) = resolver(FakeBackend::default(), store);

    resolver.start(&Navigation::none()).await;
    resolver.wait_for_refresh().await;
    assert_eq!(resolver.screen(), Screen::AdminDashboard);
}

// ── Expired stored credentials ──────────────────────────────────────

#[tokio::test]
async fn test_expired_token_is_renewed_before_refresh() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::Admin), Some("Asha Rao"), 90)),
    );
    backend.expired_sessions.lock().unwrap().insert("u-1".into());
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, false));
    let (resolver, backend, store) = resolver(backend, store);

    resolver.start(&Navigation::none()).await;
    resolver.wait_for_refresh().await;

    assert_eq!(resolver.screen(), Screen::AdminDashboard);
    assert_eq!(backend.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(backend.restored.lock().unwrap().as_deref(), Some("renewed-u-1"));
    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.access_token.as_deref(), Some("renewed-u-1"));
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-next"));
    assert_eq!(saved.role, Role::User);
}

#[tokio::test]
async fn test_unrenewable_session_is_cleared_and_signed_out() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::User), Some("Asha Rao"), 90)),
    );
    backend.expired_sessions.lock().unwrap().insert("u-1".into());
    backend.refresh_rejected.store(true, Ordering::SeqCst);
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, false));
    let (resolver, _, store) = resolver(backend, store);

    resolver.start(&Navigation::none()).await;
    assert_eq!(resolver.screen(), Screen::UserDashboard);
    resolver.wait_for_refresh().await;

    assert_eq!(resolver.screen(), Screen::Login);
    assert!(resolver.snapshot().identity().is_none());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_expiry_after_new_login_is_discarded() {
    let backend = FakeBackend::default()
        .account(
            "asha@example.com",
            "u-1",
            Some(profile(Some(Role::User), Some("Asha Rao"), 90)),
        )
        .account(
            "ravi@example.com",
            "u-2",
            Some(profile(Some(Role::User), Some("Ravi Kumar"), 90)),
        );
    backend.expired_sessions.lock().unwrap().insert("u-1".into());
    backend.refresh_rejected.store(true, Ordering::SeqCst);
    let gate = backend.gate("u-1");
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, false));
    let (resolver, _, store) = resolver(backend, store);

    resolver.start(&Navigation::none()).await;
    resolver.submit_logout().await.unwrap();
    resolver
        .submit_login("ravi@example.com", &secret("secret"))
        .await
        .unwrap();

    gate.add_permits(1);
    resolver.wait_for_refresh().await;

    assert_eq!(resolver.snapshot().identity().unwrap().id.as_str(), "u-2");
    assert_eq!(store.load().unwrap().unwrap().id.as_str(), "u-2");
}

// ── Stale-result discard ────────────────────────────────────────────

#[tokio::test]
async fn test_logout_wins_over_inflight_refresh() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::Admin), Some("Asha Rao"), 90)),
    );
    let gate = backend.gate("u-1");
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, false));
    let (resolver, _, store) = resolver(backend, store);

    resolver.start(&Navigation::none()).await;
    resolver.submit_logout().await.unwrap();

    gate.add_permits(1);
    resolver.wait_for_refresh().await;

    let state = resolver.snapshot();
    assert!(state.identity().is_none());
    assert_eq!(resolver.screen(), Screen::Login);
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_for_previous_user_does_not_touch_new_login() {
    let backend = FakeBackend::default()
        .account(
            "asha@example.com",
            "u-1",
            Some(profile(Some(Role::Admin), Some("Asha Rao"), 90)),
        )
        .account(
            "ravi@example.com",
            "u-2",
            Some(profile(Some(Role::User), Some("Ravi Kumar"), 90)),
        );
    let gate = backend.gate("u-1");
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, false));
    let (resolver, _, _) = resolver(backend, store);

    resolver.start(&Navigation::none()).await;
    resolver.submit_logout().await.unwrap();
    resolver
        .submit_login("ravi@example.com", &secret("secret"))
        .await
        .unwrap();

    gate.add_permits(1);
    resolver.wait_for_refresh().await;

    let state = resolver.snapshot();
    assert_eq!(state.identity().unwrap().id.as_str(), "u-2");
    assert_eq!(resolver.screen(), Screen::UserDashboard);
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_login_skips_setup() {
    // Name equals the email local part and the account is new: a regular
    // user would be sent to setup.
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::Admin), Some("asha"), 0)),
    );
    let (resolver, _, store) = resolver(backend, MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;

    resolver
        .submit_login("asha@example.com", &secret("secret"))
        .await
        .unwrap();

    assert_eq!(resolver.screen(), Screen::AdminDashboard);
    let record = store.load().unwrap().unwrap();
    assert_eq!(record.role, Role::Admin);
    assert!(!record.needs_profile_setup);
    assert_eq!(record.access_token.as_deref(), Some("jwt-u-1"));
}

#[tokio::test]
async fn test_new_user_goes_through_setup() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::User), None, 0)),
    );
    let (resolver, backend, store) = resolver(backend, MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;

    resolver
        .submit_login("asha@example.com", &secret("secret"))
        .await
        .unwrap();
    assert_eq!(resolver.screen(), Screen::ProfileSetup);
    assert!(store.load().unwrap().unwrap().needs_profile_setup);

    resolver.submit_profile_completion(&family()).await.unwrap();
    assert_eq!(resolver.screen(), Screen::UserDashboard);
    assert_eq!(*backend.completed.lock().unwrap(), vec!["u-1"]);

    let record = store.load().unwrap().unwrap();
    assert!(!record.needs_profile_setup);
    assert_eq!(record.full_name.as_deref(), Some("Asha Rao"));
}

#[tokio::test]
async fn test_expired_subscription_shows_interstitial() {
    let backend = FakeBackend::default().expired("late@example.com", "https://x/renew");
    let (resolver, _, store) = resolver(backend, MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;

    let err = resolver
        .submit_login("late@example.com", &secret("secret"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::SubscriptionExpired { renewal_url: Some(ref u) } if u == "https://x/renew"
    ));

    assert_eq!(resolver.screen(), Screen::Login);
    let state = resolver.snapshot();
    assert_eq!(
        state.subscription_expired().unwrap().renewal_url.as_deref(),
        Some("https://x/renew")
    );
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_credentials_leave_state_alone() {
    let backend = FakeBackend::default().account("asha@example.com", "u-1", None);
    let (resolver, _, _) = resolver(backend, MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;

    let err = resolver
        .submit_login("asha@example.com", &secret("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(resolver.screen(), Screen::Login);
    assert!(resolver.snapshot().subscription_expired().is_none());
}

#[tokio::test]
async fn test_lookup_failure_at_login_degrades() {
    let backend = FakeBackend::default().account("asha@example.com", "u-1", None);
    backend.fail_lookups.store(true, Ordering::SeqCst);
    let (resolver, _, _) = resolver(backend, MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;

    let state = resolver
        .submit_login("asha@example.com", &secret("secret"))
        .await
        .unwrap();
    assert_eq!(state.role(), Role::Unknown);
    assert_eq!(resolver.screen(), Screen::ProfileSetup);
}

#[tokio::test]
async fn test_role_falls_back_to_email_lookup() {
    let backend = FakeBackend::default();
    backend.by_email.lock().unwrap().insert(
        "asha@example.com".into(),
        profile(Some(Role::Admin), Some("Asha Rao"), 90),
    );
    let (resolver, backend, _) = resolver(backend, MemorySessionStore::new());
    let identity = Identity::new("u-1", "asha@example.com");

    assert_eq!(resolver.resolve_role(&identity).await, Role::Admin);
    assert_eq!(backend.lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_record_without_role_is_user() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(None, Some("Asha Rao"), 90)),
    );
    let (resolver, _, _) = resolver(backend, MemorySessionStore::new());
    let identity = Identity::new("u-1", "asha@example.com");

    assert_eq!(resolver.resolve_role(&identity).await, Role::User);
    assert_eq!(
        resolver.resolve_setup_status(&identity, Role::User).await,
        nurture_core::SetupStatus::Complete
    );
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_from_admin_dashboard() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::Admin), Some("Asha Rao"), 90)),
    );
    let store = Arc::new(MemorySessionStore::new());
    let backend = Arc::new(backend);
    let resolver = SessionResolver::new(backend.clone(), store.clone());
    resolver.start(&Navigation::none()).await;
    resolver
        .submit_login("asha@example.com", &secret("secret"))
        .await
        .unwrap();
    assert_eq!(resolver.screen(), Screen::AdminDashboard);

    let once = resolver.submit_logout().await.unwrap();
    let twice = resolver.submit_logout().await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(resolver.screen(), Screen::Login);
    assert_eq!(backend.sign_outs.load(Ordering::SeqCst), 2);

    // A fresh start finds nothing persisted.
    let restarted = SessionResolver::new(backend, store);
    restarted.start(&Navigation::none()).await;
    assert_eq!(restarted.screen(), Screen::Login);
}

#[tokio::test]
async fn test_reported_expiry_signs_out_first() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::User), Some("Asha Rao"), 90)),
    );
    let (resolver, _, store) = resolver(backend, MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;
    resolver
        .submit_login("asha@example.com", &secret("secret"))
        .await
        .unwrap();

    let state = resolver
        .report_subscription_expired(Some("https://x/renew".into()))
        .await
        .unwrap();
    assert!(!state.is_signed_in());
    assert!(state.subscription_expired().is_some());
    assert!(store.load().unwrap().is_none());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_dispatch_before_start_is_refused() {
    let (resolver, _, _) = resolver(FakeBackend::default(), MemorySessionStore::new());
    let err = resolver.submit_logout().await.unwrap_err();
    assert!(matches!(err, CoreError::ResolverNotRunning));
}

#[tokio::test]
async fn test_dispatch_after_shutdown_is_refused() {
    let (resolver, _, _) = resolver(FakeBackend::default(), MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;
    resolver.shutdown().await;
    let err = resolver.submit_logout().await.unwrap_err();
    assert!(matches!(err, CoreError::ResolverNotRunning));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_event_right_after_start_lands_on_bootstrap_state() {
    let store =
        MemorySessionStore::with_record(persisted("u-1", "asha@example.com", Role::User, false));
    let (resolver, _, _) = resolver(FakeBackend::default(), store);
    let mut stream = resolver.subscribe();

    let bootstrapped = resolver.start(&Navigation::none()).await;
    assert_eq!(resolver.snapshot(), bootstrapped);

    let state = resolver.submit_logout().await.unwrap();
    assert!(state.identity().is_none());
    resolver.wait_for_refresh().await;

    let seen = stream.changed().await.unwrap();
    assert!(seen.identity().is_none());
    assert_eq!(resolver.screen(), Screen::Login);
}

#[tokio::test]
async fn test_profile_completion_requires_identity() {
    let (resolver, _, _) = resolver(FakeBackend::default(), MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;
    let err = resolver
        .submit_profile_completion(&family())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotSignedIn));
}

#[tokio::test]
async fn test_subscribers_observe_login() {
    let backend = FakeBackend::default().account(
        "asha@example.com",
        "u-1",
        Some(profile(Some(Role::User), Some("Asha Rao"), 90)),
    );
    let (resolver, _, _) = resolver(backend, MemorySessionStore::new());
    resolver.start(&Navigation::none()).await;

    let mut stream = resolver.subscribe();
    assert_eq!(stream.screen(), Screen::Login);

    let login = resolver.clone();
    let handle = tokio::spawn(async move {
        login
            .submit_login("asha@example.com", &secret("secret"))
            .await
            .unwrap();
    });

    let next = stream.changed().await.unwrap();
    assert!(next.is_signed_in());
    handle.await.unwrap();
    assert_eq!(stream.screen(), Screen::UserDashboard);
}
