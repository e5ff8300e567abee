// Backend authentication
//
// Password sign-in, token refresh, sign-up, sign-out and password recovery
// against the hosted auth service. A successful sign-in installs the access token on the
// client so subsequent REST calls run as that user.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;
use url::Url;

use super::client::{BackendClient, ErrorResponse};
use super::models::{AuthSession, AuthUser, RawAuthSession};
use crate::error::Error;

impl BackendClient {
    /// Sign in with email + password (`POST /auth/v1/token?grant_type=password`).
    ///
    /// The email is trimmed and lower-cased before sending. A rejected
    /// credential pair maps to [`Error::InvalidCredentials`]; every other
    /// auth-service refusal maps to [`Error::Authentication`].
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, Error> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        debug!("signing in at {}", url);

        let body = json!({
            "email": email.trim().to_lowercase(),
            "password": password.expose_secret(),
        });

        let request = self
            .authorize_with(self.http().post(url), &self.anon_key_bearer())
            .json(&body);
        let resp = self.execute(request).await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ErrorResponse>(&raw).unwrap_or_default();
            let code = parsed.code_str();
            if matches!(
                code.as_deref(),
                Some("invalid_grant" | "invalid_credentials")
            ) {
                return Err(Error::InvalidCredentials);
            }
            return Err(Error::Authentication {
                message: format!(
                    "sign-in failed (HTTP {status}): {}",
                    parsed.text().unwrap_or(raw)
                ),
            });
        }

        let raw: RawAuthSession = self.handle_response(resp).await?;
        let session = AuthSession::from(raw);
        self.set_session_token(Some(session.access_token.clone()));

        debug!(user_id = %session.user.id, "sign-in successful");
        Ok(session)
    }

    /// Trade a refresh token for a new session
    /// (`POST /auth/v1/token?grant_type=refresh_token`).
    ///
    /// Unlike sign-in, the new access token is not installed on the client.
    /// A refresh token the service no longer accepts maps to
    /// [`Error::SessionExpired`]; the caller has to sign in again.
    pub async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, Error> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        debug!("refreshing session at {}", url);

        let request = self
            .authorize_with(self.http().post(url), &self.anon_key_bearer())
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }));
        let resp = self.execute(request).await?;

        let status = resp.status();
        if matches!(status.as_u16(), 400 | 401) {
            let raw = resp.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ErrorResponse>(&raw).unwrap_or_default();
            debug!(status = status.as_u16(), code = ?parsed.code_str(), "refresh token rejected");
            return Err(Error::SessionExpired);
        }

        let raw: RawAuthSession = self.handle_response(resp).await?;
        let session = AuthSession::from(raw);

        debug!(user_id = %session.user.id, "session refreshed");
        Ok(session)
    }

    /// Register a new account (`POST /auth/v1/signup`) on behalf of someone
    /// else. The caller's own session token is left untouched.
    ///
    /// Depending on project settings the response is either a full session
    /// (auto-confirm) or the bare user object (email confirmation pending);
    /// both yield the new [`AuthUser`].
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        full_name: Option<&str>,
    ) -> Result<AuthUser, Error> {
        let url = self.auth_url("signup")?;
        debug!("signing up at {}", url);

        let body = json!({
            "email": email.trim().to_lowercase(),
            "password": password.expose_secret(),
            "data": { "full_name": full_name },
        });

        let request = self
            .authorize_with(self.http().post(url), &self.anon_key_bearer())
            .json(&body);
        let resp = self.execute(request).await?;

        let value: serde_json::Value = self.handle_response(resp).await?;
        let user = value.get("user").cloned().unwrap_or(value);
        serde_json::from_value(user.clone()).map_err(|e| Error::Deserialization {
            message: format!("unexpected sign-up response: {e}"),
            body: user.to_string(),
        })
    }

    /// End the current session (`POST /auth/v1/logout`).
    ///
    /// The local token is dropped even if the remote call fails; a 401
    /// means the token was already invalid and counts as success.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let Some(token) = self.session_token() else {
            debug!("no active session; sign-out is a no-op");
            return Ok(());
        };
        self.set_session_token(None);

        let url = self.auth_url("logout")?;
        debug!("signing out at {}", url);

        let resp = self
            .execute(self.authorize_with(self.http().post(url), &token))
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        self.handle_empty(resp).await?;
        debug!("sign-out complete");
        Ok(())
    }

    /// Send a password-recovery email (`POST /auth/v1/recover`).
    ///
    /// `redirect_to` is where the emailed link lands; it carries the
    /// recovery markers the session resolver looks for.
    pub async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&Url>,
    ) -> Result<(), Error> {
        let mut url = self.auth_url("recover")?;
        if let Some(target) = redirect_to {
            url.query_pairs_mut()
                .append_pair("redirect_to", target.as_str());
        }

        debug!("requesting password reset at {}", url);

        let request = self
            .authorize_with(self.http().post(url), &self.anon_key_bearer())
            .json(&json!({ "email": email.trim() }));
        let resp = self.execute(request).await?;
        self.handle_empty(resp).await
    }

    /// Set a new password using the recovery access token from the
    /// emailed link (`PUT /auth/v1/user`).
    pub async fn update_password(
        &self,
        recovery_token: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), Error> {
        let url = self.auth_url("user")?;
        debug!("updating password at {}", url);

        let request = self
            .authorize_with(self.http().put(url), recovery_token)
            .json(&json!({ "password": new_password.expose_secret() }));
        let resp = self.execute(request).await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        self.handle_empty(resp).await
    }

    fn anon_key_bearer(&self) -> SecretString {
        // Auth endpoints authenticate the project, not a user.
        self.anon_key().clone()
    }
}
