// Hosted backend HTTP client
//
// Wraps `reqwest::Client` with the backend's URL layout (`auth/v1`,
// `rest/v1`, `rest/v1/rpc`), header injection and error-shape parsing.
// Auth flows and table access are implemented as inherent methods in
// sibling files to keep this module focused on transport mechanics.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::{self, TransportConfig};

/// PostgREST error body: `{"code": "...", "message": "...", "details": ..., "hint": ...}`.
///
/// The auth service uses a different shape (`error`, `error_description`,
/// `msg`, `error_code`); both are captured here so one parser handles both.
#[derive(serde::Deserialize, Default)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn text(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }

    pub(crate) fn code_str(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => self.error_code.clone().or_else(|| self.error.clone()),
        }
    }
}

/// Raw HTTP client for the hosted auth + data backend.
///
/// Every request carries the project's anon key in the `apikey` header.
/// The `Authorization` bearer is the signed-in user's access token when a
/// session is active and the anon key otherwise, so row-level policies see
/// the right principal.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    timeout: Duration,
    /// Access token of the signed-in user. Set by a successful sign-in or
    /// restored from a persisted session; cleared on sign-out.
    session_token: RwLock<Option<SecretString>>,
}

impl BackendClient {
    /// Create a client from the project URL, anon key and transport settings.
    pub fn new(
        base_url: &str,
        anon_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::with_client(http, base_url, anon_key)?;
        client.timeout = transport.timeout;
        Ok(client)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Timeouts are reported against the default transport limit.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        anon_key: &SecretString,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            anon_key: anon_key.clone(),
            timeout: TransportConfig::default().timeout,
            session_token: RwLock::new(None),
        })
    }

    /// The project base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn anon_key(&self) -> &SecretString {
        &self.anon_key
    }

    // ── Session token management ──────────────────────────────────────

    /// Install (or clear) the bearer token used for subsequent requests.
    pub fn set_session_token(&self, token: Option<SecretString>) {
        trace!(present = token.is_some(), "session token updated");
        *self.session_token.write().expect("session token lock poisoned") = token;
    }

    /// Whether a user session token is currently installed.
    pub fn has_session(&self) -> bool {
        self.session_token
            .read()
            .expect("session token lock poisoned")
            .is_some()
    }

    pub(crate) fn session_token(&self) -> Option<SecretString> {
        self.session_token
            .read()
            .expect("session token lock poisoned")
            .clone()
    }

    /// Apply `apikey` + `Authorization` headers to a request builder.
    pub(crate) fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .session_token()
            .unwrap_or_else(|| self.anon_key.clone());
        self.authorize_with(builder, &bearer)
    }

    /// Apply headers using an explicit bearer token.
    pub(crate) fn authorize_with(
        &self,
        builder: reqwest::RequestBuilder,
        bearer: &SecretString,
    ) -> reqwest::RequestBuilder {
        let mut apikey = HeaderValue::from_str(self.anon_key.expose_secret())
            .unwrap_or_else(|_| HeaderValue::from_static(""));
        apikey.set_sensitive(true);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", bearer.expose_secret()))
            .unwrap_or_else(|_| HeaderValue::from_static(""));
        auth.set_sensitive(true);
        builder.header("apikey", apikey).header("Authorization", auth)
    }

    /// Send a prepared request.
    pub(crate) async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        transport::send(request, self.timeout).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/auth/v1/{path}`
    pub(crate) fn auth_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("auth/v1/{path}"))?)
    }

    /// `{base}/rest/v1/{table}`
    pub(crate) fn rest_url(&self, table: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("rest/v1/{table}"))?)
    }

    /// `{base}/rest/v1/rpc/{function}`
    pub(crate) fn rpc_url(&self, function: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("rest/v1/rpc/{function}"))?)
    }

    /// `{base}/functions/v1/{function}`
    pub fn function_url(&self, function: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("functions/v1/{function}"))?)
    }

    // ── Response handling ────────────────────────────────────────────

    /// Deserialize a successful response or map the error body.
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    pub(crate) async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    pub(crate) async fn parse_error(
        &self,
        status: reqwest::StatusCode,
        resp: reqwest::Response,
    ) -> Error {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorResponse>(&raw).unwrap_or_default();
        let code = parsed.code_str();

        // PostgREST reports expired JWTs as PGRST301 / 401.
        if status == reqwest::StatusCode::UNAUTHORIZED
            && (code.as_deref() == Some("PGRST301")
                || parsed
                    .text()
                    .is_some_and(|m| m.to_ascii_lowercase().contains("jwt expired")))
        {
            return Error::SessionExpired;
        }

        debug!(status = status.as_u16(), ?code, "backend request failed");
        Error::Backend {
            status: status.as_u16(),
            message: parsed.text().unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.clone()
                }
            }),
            code,
        }
    }
}

/// Ensure the base URL ends with `/` so relative joins keep any path prefix.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}
