// ── Session resolver ──
//
// Owns the one `SessionState` writer. Every transition arrives as a
// message on an mpsc channel and is applied by a single processor task,
// strictly in arrival order. Readers observe snapshots through a watch
// channel and never mutate.
//
// Bootstrap adopts a persisted session's role and setup flags as
// provisional values and refreshes them in the background. The refresh
// result is tagged with the identity and the event epoch it was issued
// under; the processor drops it if any auth event landed in between.
// An expired access token is renewed with the persisted refresh token;
// when that fails too, the session is cleared and signed out.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{IdentityBackend, SessionStore};
use crate::error::{AuthError, CoreError};
use crate::model::{FamilyProfile, Identity, PersistedIdentity, Profile, Role, SetupStatus, UserId};
use crate::router::{Screen, route};
use crate::session::setup::setup_status_for;
use crate::session::{AuthEvent, Navigation, SessionState, on_auth_event};
use crate::stream::SessionStream;

const EVENT_CHANNEL_SIZE: usize = 64;

// ── Messages ─────────────────────────────────────────────────────

enum Message {
    Auth(AuthEvent),
    /// Result of a background role/setup refresh.
    Refreshed {
        for_identity: UserId,
        epoch: u64,
        role: Role,
        setup_status: SetupStatus,
    },
    /// New credentials for the provisional session.
    Renewed { epoch: u64, record: PersistedIdentity },
    /// The provisional session can no longer be renewed.
    Expired { for_identity: UserId, epoch: u64 },
}

struct Envelope {
    message: Message,
    reply: Option<oneshot::Sender<SessionState>>,
}

// ── SessionResolver ──────────────────────────────────────────────

/// Produces the current [`SessionState`] and advances it on auth events.
///
/// Cheaply cloneable via `Arc<ResolverInner>`. Call
/// [`start()`](Self::start) once to bootstrap and spawn the processor;
/// the dispatchers fail with [`CoreError::ResolverNotRunning`] before that.
#[derive(Clone)]
pub struct SessionResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    backend: Arc<dyn IdentityBackend>,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionState>,
    event_tx: mpsc::Sender<Envelope>,
    event_rx: Mutex<Option<mpsc::Receiver<Envelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    refresh_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionResolver {
    /// Create a resolver in the initial loading state. Does NOT bootstrap.
    pub fn new(backend: Arc<dyn IdentityBackend>, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ResolverInner {
                backend,
                store,
                state,
                event_tx,
                event_rx: Mutex::new(Some(event_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                refresh_handle: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Bootstrap from `navigation` and the persisted session, then start
    /// processing events.
    ///
    /// Returns without waiting on the network: a persisted session yields
    /// provisional values immediately while the refresh runs in the
    /// background. Calling `start` again returns the current snapshot.
    pub async fn start(&self, navigation: &Navigation) -> SessionState {
        let Some(rx) = self.inner.event_rx.lock().await.take() else {
            return self.snapshot();
        };

        let (state, provisional) = self.bootstrap_state(navigation);
        self.inner.state.send_replace(state.clone());

        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(event_processor_task(self.clone(), rx)));

        if let Some(persisted) = provisional {
            self.inner.backend.restore_session(&persisted);
            let handle = tokio::spawn(refresh_task(self.clone(), persisted, 0));
            *self.inner.refresh_handle.lock().await = Some(handle);
        }

        info!(screen = %route(&state), "session bootstrapped");
        state
    }

    /// Stop the processor and any in-flight refresh.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.refresh_handle.lock().await.take() {
            let _ = handle.await;
        }
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("session resolver stopped");
    }

    /// Wait until the bootstrap refresh (if any) has been applied or
    /// discarded.
    pub async fn wait_for_refresh(&self) {
        let handle = self.inner.refresh_handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn bootstrap_state(&self, navigation: &Navigation) -> (SessionState, Option<PersistedIdentity>) {
        if navigation.is_recovery() {
            debug!(path = navigation.path(), "recovery link detected");
            return (SessionState::recovery(), None);
        }

        match self.inner.store.load() {
            Ok(Some(persisted)) if persisted.authenticated => {
                debug!(user = %persisted.id, role = %persisted.role, "adopting persisted session");
                let state = SessionState::authenticated(
                    persisted.identity(),
                    persisted.role,
                    persisted.setup_status(),
                );
                (state, Some(persisted))
            }
            Ok(_) => (SessionState::empty(), None),
            Err(e) => {
                warn!(error = %e, "could not read persisted session; starting signed out");
                (SessionState::empty(), None)
            }
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn screen(&self) -> Screen {
        route(&self.inner.state.borrow())
    }

    pub fn subscribe(&self) -> SessionStream {
        SessionStream::new(self.inner.state.subscribe())
    }

    // ── Dispatchers ──────────────────────────────────────────────

    /// Authenticate, resolve role and setup status, persist, then apply
    /// `LoginSuccess`.
    ///
    /// A lapsed subscription applies `SubscriptionExpired` before the
    /// error is returned, so the login screen can show the renewal link.
    pub async fn submit_login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SessionState, AuthError> {
        let authenticated = match self.inner.backend.authenticate(email, password).await {
            Ok(a) => a,
            Err(AuthError::SubscriptionExpired { renewal_url }) => {
                info!(email, "sign-in refused: subscription expired");
                self.dispatch(AuthEvent::SubscriptionExpired {
                    renewal_url: renewal_url.clone(),
                })
                .await?;
                return Err(AuthError::SubscriptionExpired { renewal_url });
            }
            Err(e) => return Err(e),
        };

        let identity = authenticated.identity.clone();
        let (role, setup_status, profile) = self.resolve_for_login(&identity).await;

        let full_name = profile
            .and_then(|p| p.display_name)
            .or(authenticated.display_name)
            .unwrap_or_else(|| identity.email_local_part().to_owned());
        let record = PersistedIdentity {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role,
            full_name: Some(full_name),
            authenticated: true,
            needs_profile_setup: setup_status == SetupStatus::NeedsProfileSetup,
            login_time: Utc::now(),
            access_token: authenticated
                .access_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            refresh_token: authenticated
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
        };
        if let Err(e) = self.inner.store.persist(&record) {
            warn!(error = %e, "could not persist session; it will not survive a restart");
        }

        info!(user = %identity.id, %role, setup = %setup_status, "signed in");
        Ok(self
            .dispatch(AuthEvent::LoginSuccess {
                identity,
                role,
                setup_status,
            })
            .await?)
    }

    /// Clear the persisted session, apply `Logout`, then end the remote
    /// session. Idempotent.
    pub async fn submit_logout(&self) -> Result<SessionState, CoreError> {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "could not clear persisted session");
        }
        let state = self.dispatch(AuthEvent::Logout).await?;
        if let Err(e) = self.inner.backend.sign_out().await {
            warn!(error = %e, "remote sign-out failed (non-fatal)");
        }
        info!("signed out");
        Ok(state)
    }

    /// Save the family profile and mark setup complete.
    pub async fn submit_profile_completion(
        &self,
        profile: &FamilyProfile,
    ) -> Result<SessionState, CoreError> {
        let identity = self
            .snapshot()
            .identity()
            .cloned()
            .ok_or(CoreError::NotSignedIn)?;
        profile
            .validate()
            .map_err(|message| CoreError::ValidationFailed { message })?;

        self.inner.backend.complete_profile(&identity, profile).await?;

        match self.inner.store.load() {
            Ok(Some(mut record)) if record.id == identity.id => {
                record.needs_profile_setup = false;
                record.full_name = Some(profile.full_name.clone());
                if let Err(e) = self.inner.store.persist(&record) {
                    warn!(error = %e, "could not update persisted session");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not read persisted session"),
        }

        info!(user = %identity.id, "profile setup completed");
        self.dispatch(AuthEvent::ProfileCompleted).await
    }

    /// Show the renewal interstitial. A signed-in session is logged out
    /// first, since the interstitial only exists on the login screen.
    pub async fn report_subscription_expired(
        &self,
        renewal_url: Option<String>,
    ) -> Result<SessionState, CoreError> {
        if self.snapshot().is_signed_in() {
            self.submit_logout().await?;
        }
        self.dispatch(AuthEvent::SubscriptionExpired { renewal_url })
            .await
    }

    // ── Account helpers ──────────────────────────────────────────

    pub async fn request_password_reset(&self, email: &str) -> Result<(), CoreError> {
        self.inner.backend.request_password_reset(email).await
    }

    pub async fn complete_password_reset(
        &self,
        recovery_token: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), CoreError> {
        self.inner
            .backend
            .complete_password_reset(recovery_token, new_password)
            .await
    }

    // ── Role and setup resolution ────────────────────────────────

    /// Role from the first profile record found. Lookup failures degrade
    /// to `Unknown`.
    pub async fn resolve_role(&self, identity: &Identity) -> Role {
        match self.lookup_profile(identity).await {
            Ok(profile) => role_of(profile.as_ref()),
            Err(e) => {
                warn!(user = %identity.id, error = %e, "role lookup failed");
                Role::Unknown
            }
        }
    }

    /// Setup status for `identity` under `role`. Lookup failures degrade
    /// to `NeedsProfileSetup`.
    pub async fn resolve_setup_status(&self, identity: &Identity, role: Role) -> SetupStatus {
        if role.is_admin() {
            return SetupStatus::Complete;
        }
        match self.lookup_profile(identity).await {
            Ok(profile) => setup_status_for(identity, role, profile.as_ref(), Utc::now()),
            Err(e) => {
                warn!(user = %identity.id, error = %e, "setup status lookup failed");
                SetupStatus::NeedsProfileSetup
            }
        }
    }

    async fn resolve_for_login(&self, identity: &Identity) -> (Role, SetupStatus, Option<Profile>) {
        match self.lookup_profile(identity).await {
            Ok(profile) => {
                let role = role_of(profile.as_ref());
                let setup = setup_status_for(identity, role, profile.as_ref(), Utc::now());
                (role, setup, profile)
            }
            Err(e) => {
                warn!(user = %identity.id, error = %e, "profile lookup failed during sign-in");
                (Role::Unknown, SetupStatus::NeedsProfileSetup, None)
            }
        }
    }

    /// Identity key first; the email only when that definitively has no
    /// record. Sequential, never in parallel.
    async fn lookup_profile(&self, identity: &Identity) -> Result<Option<Profile>, CoreError> {
        if let Some(profile) = self
            .inner
            .backend
            .lookup_profile_by_identity(&identity.id)
            .await?
        {
            return Ok(Some(profile));
        }
        debug!(user = %identity.id, "no profile under identity key; trying email");
        self.inner
            .backend
            .lookup_profile_by_email(&identity.email)
            .await
    }

    /// Profile lookup for a provisional session, renewing its credentials
    /// once if the access token has expired.
    async fn lookup_with_renewal(
        &self,
        persisted: &PersistedIdentity,
        epoch: u64,
    ) -> Result<Option<Profile>, CoreError> {
        let identity = persisted.identity();
        match self.lookup_profile(&identity).await {
            Err(CoreError::SessionExpired) => {
                debug!(user = %identity.id, "access token expired; renewing session");
                let record = self.inner.backend.refresh_session(persisted).await?;
                self.send(Message::Renewed { epoch, record }).await?;
                self.lookup_profile(&identity).await
            }
            other => other,
        }
    }

    // ── Event channel ────────────────────────────────────────────

    async fn dispatch(&self, event: AuthEvent) -> Result<SessionState, CoreError> {
        self.send(Message::Auth(event)).await
    }

    async fn send(&self, message: Message) -> Result<SessionState, CoreError> {
        if self.inner.event_rx.lock().await.is_some() || self.inner.cancel.is_cancelled() {
            return Err(CoreError::ResolverNotRunning);
        }
        let (tx, rx) = oneshot::channel();
        self.inner
            .event_tx
            .send(Envelope {
                message,
                reply: Some(tx),
            })
            .await
            .map_err(|_| CoreError::ResolverNotRunning)?;
        rx.await.map_err(|_| CoreError::ResolverNotRunning)
    }

    /// Apply one message. Only ever called from the processor task.
    fn apply(&self, message: Message, epoch: &mut u64) -> SessionState {
        let current = self.snapshot();
        let current_epoch = *epoch;
        let holds = |id: &UserId, issued_at: u64| {
            current.identity().map(|i| &i.id) == Some(id) && issued_at == current_epoch
        };
        let next = match message {
            Message::Auth(event) => {
                *epoch += 1;
                on_auth_event(&current, event)
            }
            Message::Refreshed {
                for_identity,
                epoch: issued_at,
                role,
                setup_status,
            } => match current.identity() {
                Some(identity) if holds(&for_identity, issued_at) => {
                    debug!(user = %for_identity, %role, setup = %setup_status, "refresh applied");
                    SessionState::authenticated(identity.clone(), role, setup_status)
                }
                _ => {
                    debug!(user = %for_identity, "discarding stale session refresh");
                    current.clone()
                }
            },
            Message::Renewed {
                epoch: issued_at,
                record,
            } => {
                if holds(&record.id, issued_at) {
                    debug!(user = %record.id, "session renewed");
                    self.inner.backend.restore_session(&record);
                    if let Err(e) = self.inner.store.persist(&record) {
                        warn!(error = %e, "could not persist renewed session");
                    }
                } else {
                    debug!(user = %record.id, "discarding stale session renewal");
                }
                current.clone()
            }
            Message::Expired {
                for_identity,
                epoch: issued_at,
            } => {
                if holds(&for_identity, issued_at) {
                    info!(user = %for_identity, "stored session expired; signing out");
                    if let Err(e) = self.inner.store.clear() {
                        warn!(error = %e, "could not clear persisted session");
                    }
                    *epoch += 1;
                    on_auth_event(&current, AuthEvent::Logout)
                } else {
                    debug!(user = %for_identity, "discarding stale session expiry");
                    current.clone()
                }
            }
        };

        if next != current {
            debug!(screen = %route(&next), "session state replaced");
            self.inner.state.send_replace(next.clone());
        }
        next
    }
}

fn role_of(profile: Option<&Profile>) -> Role {
    profile.map_or(Role::Unknown, |p| p.role.unwrap_or(Role::User))
}

// ── Background tasks ─────────────────────────────────────────────

/// Apply messages from the channel one at a time, in arrival order.
async fn event_processor_task(resolver: SessionResolver, mut rx: mpsc::Receiver<Envelope>) {
    let cancel = resolver.inner.cancel.clone();
    let mut epoch: u64 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let next = resolver.apply(envelope.message, &mut epoch);
                if let Some(reply) = envelope.reply {
                    let _ = reply.send(next);
                }
            }
        }
    }
}

/// Re-resolve role and setup for a provisional session.
///
/// An expired access token is renewed once with the persisted refresh
/// token before giving up on the session. Other failures and "no record"
/// keep the provisional values: the refresh only ever replaces them with
/// a confirmed answer.
async fn refresh_task(resolver: SessionResolver, persisted: PersistedIdentity, epoch: u64) {
    let cancel = resolver.inner.cancel.clone();
    let identity = persisted.identity();

    let profile = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = resolver.lookup_with_renewal(&persisted, epoch) => result,
    };

    let profile = match profile {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            debug!(user = %identity.id, "refresh found no profile; keeping provisional values");
            return;
        }
        Err(CoreError::SessionExpired) => {
            let message = Message::Expired {
                for_identity: identity.id,
                epoch,
            };
            if let Err(e) = resolver.send(message).await {
                debug!(error = %e, "session expiry not delivered");
            }
            return;
        }
        Err(e) => {
            warn!(user = %identity.id, error = %e, "session refresh failed; keeping provisional values");
            return;
        }
    };

    let role = role_of(Some(&profile));
    let setup_status = setup_status_for(&identity, role, Some(&profile), Utc::now());
    let message = Message::Refreshed {
        for_identity: identity.id,
        epoch,
        role,
        setup_status,
    };
    if let Err(e) = resolver.send(message).await {
        debug!(error = %e, "refresh result not delivered");
    }
}
