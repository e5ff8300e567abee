//! CLI error types with miette diagnostics.
//!
//! Maps core, auth and config errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use nurture_config::ConfigError;
use nurture_core::{AuthError, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(nurture::connection_failed),
        help(
            "Check your network connection and the profile's backend_url.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(nurture::timeout),
        help("Increase the timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Invalid email or password")]
    #[diagnostic(
        code(nurture::invalid_credentials),
        help("Forgot it? Run: nurture password forgot <email>")
    )]
    InvalidCredentials,

    #[error("Your subscription has expired")]
    #[diagnostic(code(nurture::subscription_expired), help("{renewal}"))]
    SubscriptionExpired { renewal: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(code(nurture::auth_failed), help("Sign in again with: nurture login"))]
    AuthFailed { message: String },

    #[error("Not signed in")]
    #[diagnostic(code(nurture::not_signed_in), help("Sign in with: nurture login"))]
    NotSignedIn,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(nurture::no_credentials),
        help(
            "Configure the backend anon key with: nurture config init\n\
             Or set NURTURE_ANON_KEY."
        )
    )]
    NoCredentials { profile: String },

    // ── Access ───────────────────────────────────────────────────────
    #[error("Profile setup is not complete")]
    #[diagnostic(
        code(nurture::setup_required),
        help("Finish it with: nurture profile setup")
    )]
    SetupRequired,

    #[error("This command requires the {required} role")]
    #[diagnostic(code(nurture::permission_denied))]
    PermissionDenied { required: String },

    #[error("AI tools are not configured for profile '{profile}'")]
    #[diagnostic(
        code(nurture::ai_not_configured),
        help(
            "Add an AI key with: nurture config set-secret ai-api-key\n\
             Or set ai_proxy in the profile to use the backend function."
        )
    )]
    AiNotConfigured { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(nurture::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("Rejected: {message}")]
    #[diagnostic(code(nurture::conflict))]
    Conflict { message: String },

    // ── Remote services ──────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(nurture::api_error))]
    ApiError { code: String, message: String },

    #[error("AI service error: {message}")]
    #[diagnostic(
        code(nurture::ai_error),
        help("The assistant could not answer right now. Try again in a moment.")
    )]
    Ai { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nurture::validation))]
    Validation { field: String, reason: String },

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(nurture::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nurture::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: nurture config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(nurture::no_config),
        help(
            "Create one with: nurture config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(nurture::config))]
    Config { message: String },

    // ── Local ────────────────────────────────────────────────────────
    #[error("Session storage error: {message}")]
    #[diagnostic(
        code(nurture::storage),
        help("Delete the session file to start over (see: nurture config path).")
    )]
    Storage { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(nurture::internal))]
    Internal { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(nurture::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::InvalidCredentials
            | Self::SubscriptionExpired { .. }
            | Self::AuthFailed { .. }
            | Self::NotSignedIn
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::SetupRequired | Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::AiNotConfigured { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Wrap a prompt / terminal I/O failure.
    pub fn prompt(err: impl std::fmt::Display) -> Self {
        Self::Validation {
            field: "interactive".into(),
            reason: format!("prompt failed: {err}"),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::SessionExpired => CliError::AuthFailed {
                message: "session expired".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotSignedIn => CliError::NotSignedIn,

            CoreError::PermissionDenied { required } => CliError::PermissionDenied { required },

            CoreError::SetupIncomplete => CliError::SetupRequired,

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type,
                identifier,
            },

            CoreError::Rejected { message } => CliError::Conflict { message },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api {
                message,
                code,
                status,
            } => CliError::ApiError {
                code: code
                    .or_else(|| status.map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::Ai { message } => CliError::Ai { message },

            CoreError::Storage { message } => CliError::Storage { message },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::ResolverNotRunning => CliError::Internal {
                message: "session resolver is not running".into(),
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => CliError::InvalidCredentials,
            AuthError::SubscriptionExpired { renewal_url } => CliError::SubscriptionExpired {
                renewal: renewal_hint(renewal_url.as_deref()),
            },
            AuthError::Backend(e) => e.into(),
        }
    }
}

/// Help line shown with an expired subscription.
pub fn renewal_hint(renewal_url: Option<&str>) -> String {
    match renewal_url {
        Some(url) => format!("Renew your subscription at: {url}"),
        None => "Contact your administrator to renew your subscription.".into(),
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
