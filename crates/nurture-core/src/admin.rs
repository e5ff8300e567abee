// ── Administrator operations ──
//
// Usage statistics, account management and subscription upkeep. Every
// call checks the caller's session for the admin role before touching
// the backend.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::error::CoreError;
use crate::model::{CreatedUser, Role, SubscriptionStatus, UsageStats, UserSummary};
use crate::router::{Screen, route};
use crate::session::SessionState;

/// Shortest password accepted for an administrator-created account.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Default look-ahead for the "expiring soon" listing.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 7;

#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn usage_stats(&self) -> Result<UsageStats, CoreError>;
    async fn list_users(&self) -> Result<Vec<UserSummary>, CoreError>;

    /// Register an account and its `app_users` row. Fails with
    /// `Rejected` when the email is already present.
    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<CreatedUser, CoreError>;

    /// Fails with `NotFound` for an unknown email and `Rejected` when the
    /// account is already an administrator.
    async fn promote_user(&self, email: &str) -> Result<(), CoreError>;

    async fn subscription_status(&self, email: &str) -> Result<SubscriptionStatus, CoreError>;
    async fn renewal_url(&self) -> Result<Option<String>, CoreError>;
    async fn set_renewal_url(&self, url: &str) -> Result<(), CoreError>;
    async fn renew_subscription(&self, email: &str) -> Result<(), CoreError>;
    async fn refresh_subscription_statuses(&self) -> Result<(), CoreError>;
    async fn expiring_soon(&self, days: u32) -> Result<Vec<UserSummary>, CoreError>;
}

pub struct AdminService {
    backend: Arc<dyn AdminBackend>,
}

impl AdminService {
    pub fn new(backend: Arc<dyn AdminBackend>) -> Self {
        Self { backend }
    }

    pub async fn usage_stats(&self, session: &SessionState) -> Result<UsageStats, CoreError> {
        require_admin(session)?;
        self.backend.usage_stats().await
    }

    pub async fn list_users(&self, session: &SessionState) -> Result<Vec<UserSummary>, CoreError> {
        require_admin(session)?;
        self.backend.list_users().await
    }

    pub async fn create_user(
        &self,
        session: &SessionState,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<CreatedUser, CoreError> {
        require_admin(session)?;
        let email = normalize_email(email)?;
        if password.expose_secret().chars().count() < MIN_PASSWORD_CHARS {
            return Err(CoreError::ValidationFailed {
                message: format!("password must be at least {MIN_PASSWORD_CHARS} characters"),
            });
        }
        let role = if role == Role::Unknown { Role::User } else { role };

        let created = self.backend.create_user(&email, password, role).await?;
        info!(email = %created.email, %role, "account created");
        Ok(created)
    }

    pub async fn promote_user(&self, session: &SessionState, email: &str) -> Result<(), CoreError> {
        require_admin(session)?;
        let email = normalize_email(email)?;
        self.backend.promote_user(&email).await?;
        info!(%email, "account promoted to admin");
        Ok(())
    }

    pub async fn subscription_status(
        &self,
        session: &SessionState,
        email: &str,
    ) -> Result<SubscriptionStatus, CoreError> {
        require_admin(session)?;
        self.backend.subscription_status(&normalize_email(email)?).await
    }

    pub async fn renewal_url(&self, session: &SessionState) -> Result<Option<String>, CoreError> {
        require_admin(session)?;
        self.backend.renewal_url().await
    }

    pub async fn set_renewal_url(&self, session: &SessionState, url: &str) -> Result<(), CoreError> {
        require_admin(session)?;
        let parsed = url::Url::parse(url.trim()).map_err(|e| CoreError::ValidationFailed {
            message: format!("invalid renewal URL: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::ValidationFailed {
                message: "renewal URL must be http or https".into(),
            });
        }
        self.backend.set_renewal_url(parsed.as_str()).await?;
        info!(url = %parsed, "renewal URL updated");
        Ok(())
    }

    pub async fn renew_subscription(
        &self,
        session: &SessionState,
        email: &str,
    ) -> Result<(), CoreError> {
        require_admin(session)?;
        let email = normalize_email(email)?;
        self.backend.renew_subscription(&email).await?;
        info!(%email, "subscription renewed");
        Ok(())
    }

    pub async fn refresh_subscription_statuses(&self, session: &SessionState) -> Result<(), CoreError> {
        require_admin(session)?;
        self.backend.refresh_subscription_statuses().await
    }

    pub async fn expiring_soon(
        &self,
        session: &SessionState,
        days: u32,
    ) -> Result<Vec<UserSummary>, CoreError> {
        require_admin(session)?;
        self.backend.expiring_soon(days).await
    }
}

fn require_admin(session: &SessionState) -> Result<(), CoreError> {
    match route(session) {
        Screen::AdminDashboard => Ok(()),
        Screen::Login | Screen::PasswordReset => Err(CoreError::NotSignedIn),
        Screen::Loading => Err(CoreError::ResolverNotRunning),
        Screen::UserDashboard | Screen::ProfileSetup => Err(CoreError::PermissionDenied {
            required: Role::Admin.to_string(),
        }),
    }
}

fn normalize_email(raw: &str) -> Result<String, CoreError> {
    let email = raw.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(CoreError::ValidationFailed {
            message: format!("'{}' is not an email address", raw.trim()),
        })
    }
}
