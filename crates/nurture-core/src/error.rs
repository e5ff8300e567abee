// ── Core error types ──
//
// User-facing errors from nurture-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<nurture_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- sign in again")]
    SessionExpired,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Not signed in")]
    NotSignedIn,

    #[error("This action requires the {required} role")]
    PermissionDenied { required: String },

    #[error("Profile setup must be completed first")]
    SetupIncomplete,

    #[error("Session resolver is not running")]
    ResolverNotRunning,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Operation rejected: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Backend error code (PostgREST / auth service), if any.
        code: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("AI service error: {message}")]
    Ai { message: String },

    // ── Local storage ────────────────────────────────────────────────
    #[error("Session storage error: {message}")]
    Storage { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The two login failures a user is shown, plus everything else.
///
/// `InvalidCredentials` and `SubscriptionExpired` are rendered on the
/// login screen; `Backend` carries any other failure for diagnostics.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Subscription expired")]
    SubscriptionExpired { renewal_url: Option<String> },

    #[error(transparent)]
    Backend(#[from] CoreError),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nurture_api::Error> for CoreError {
    fn from(err: nurture_api::Error) -> Self {
        match err {
            nurture_api::Error::InvalidCredentials => CoreError::AuthenticationFailed {
                message: "Invalid email or password".into(),
            },
            nurture_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            nurture_api::Error::SessionExpired => CoreError::SessionExpired,
            nurture_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            nurture_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            nurture_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            nurture_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            nurture_api::Error::RateLimited { retry_after_secs } => CoreError::Api {
                message: format!("Rate limited -- retry after {retry_after_secs}s"),
                code: Some("rate_limited".into()),
                status: Some(429),
            },
            nurture_api::Error::Backend {
                message,
                code,
                status,
            } => match status {
                401 | 403 => CoreError::PermissionDenied {
                    required: format!("backend permission ({message})"),
                },
                404 => CoreError::NotFound {
                    entity_type: "resource".into(),
                    identifier: message,
                },
                _ => CoreError::Api {
                    message,
                    code,
                    status: Some(status),
                },
            },
            nurture_api::Error::Ai { message, status } => CoreError::Ai {
                message: format!("{message} (HTTP {status})"),
            },
            nurture_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            nurture_api::Error::Configuration(message) => CoreError::Config { message },
        }
    }
}

impl From<nurture_api::Error> for AuthError {
    fn from(err: nurture_api::Error) -> Self {
        match err {
            nurture_api::Error::InvalidCredentials => AuthError::InvalidCredentials,
            other => AuthError::Backend(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_404_becomes_not_found() {
        let err: CoreError = nurture_api::Error::Backend {
            message: "missing".into(),
            code: None,
            status: 404,
        }
        .into();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn invalid_credentials_stay_distinguishable() {
        let err: AuthError = nurture_api::Error::InvalidCredentials.into();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err: AuthError = nurture_api::Error::SessionExpired.into();
        assert!(matches!(err, AuthError::Backend(CoreError::SessionExpired)));
    }
}
