// ── Identity, role and setup status ──
//
// The minimal authenticated-user record plus the two facts the router
// needs about it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── UserId ──────────────────────────────────────────────────────────

/// Opaque identifier of an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Identity ────────────────────────────────────────────────────────

/// Established by successful credential verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// The part of the email before `@` (the whole address if there is none).
    pub fn email_local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

// ── Role ────────────────────────────────────────────────────────────

/// Gates which dashboard is shown. `Unknown` routes like `User`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[default]
    Unknown,
    User,
    Admin,
}

impl Role {
    /// Interpret a stored role column. Absent means "no opinion"; any
    /// value other than `admin` is a regular user.
    pub fn from_stored(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(if raw.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        })
    }

    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

// ── SetupStatus ─────────────────────────────────────────────────────

/// Whether the first-run family profile wizard still needs to run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SetupStatus {
    #[default]
    Unknown,
    NeedsProfileSetup,
    Complete,
}

// ── PersistedIdentity ───────────────────────────────────────────────

/// The locally persisted record left by a successful login.
///
/// `role` and `needs_profile_setup` are provisional on the next start:
/// they are adopted immediately and then re-resolved in the background.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedIdentity {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub needs_profile_setup: bool,
    pub login_time: DateTime<Utc>,
    /// Backend access token, so lookups run as this user after a restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Exchanged for a new access token once the stored one expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl PersistedIdentity {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id.clone(), self.email.clone())
    }

    pub fn setup_status(&self) -> SetupStatus {
        if self.needs_profile_setup {
            SetupStatus::NeedsProfileSetup
        } else {
            SetupStatus::Complete
        }
    }
}

impl fmt::Debug for PersistedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedIdentity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("full_name", &self.full_name)
            .field("authenticated", &self.authenticated)
            .field("needs_profile_setup", &self.needs_profile_setup)
            .field("login_time", &self.login_time)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
