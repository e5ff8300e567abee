use thiserror::Error;

/// Top-level error type for the `nurture-api` crate.
///
/// Covers every failure mode across both API surfaces: the hosted
/// auth/data backend and the generative-AI service.
/// `nurture-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The auth endpoint rejected the email/password pair.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Any other auth failure (unconfirmed email, locked account, ...).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The bearer token was rejected (expired or revoked).
    #[error("Session expired -- sign in again")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Rate limited by the remote service.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Backend (REST / RPC) ────────────────────────────────────────
    /// Structured error from the REST or RPC layer.
    #[error("Backend error (HTTP {status}): {message}")]
    Backend {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Generative AI ───────────────────────────────────────────────
    /// The AI provider returned an error or an unusable candidate.
    #[error("AI service error (HTTP {status}): {message}")]
    Ai { message: String, status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Client was built with unusable settings (bad header value, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),
}
