// Generative-AI HTTP client
//
// Two deployment shapes share one client:
//   Direct: POST {base}/v1beta/models/{model}:generateContent, x-goog-api-key
//   Proxy:  POST {backend}/functions/v1/{function}, apikey + Bearer anon key
// The proxy forwards the same request body and returns the provider's
// response verbatim, so response handling is identical.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{Completion, GenerateRequest, GenerateResponse};
use crate::backend::client::ErrorResponse;
use crate::error::Error;
use crate::transport::{self, TransportConfig};

/// Default provider endpoint.
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for every tool.
pub const DEFAULT_AI_MODEL: &str = "gemini-2.0-flash-exp";

/// Client for a Gemini-compatible `generateContent` endpoint.
pub struct GenerativeClient {
    http: reqwest::Client,
    endpoint: Url,
    model: String,
    timeout: Duration,
}

impl GenerativeClient {
    /// Talk to the provider directly with an API key.
    ///
    /// The key is injected once as a sensitive default header.
    pub fn direct(
        base_url: &str,
        model: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|e| Error::Configuration(format!("invalid AI API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        let http = transport.build_client_with_headers(headers)?;
        let base = base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/v1beta/models/{model}:generateContent"))?;

        Ok(Self {
            http,
            endpoint,
            model: model.to_owned(),
            timeout: transport.timeout,
        })
    }

    /// Route generation through a backend function that holds the
    /// provider key server-side.
    pub fn proxy(
        function_url: Url,
        anon_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut apikey = HeaderValue::from_str(anon_key.expose_secret())
            .map_err(|e| Error::Configuration(format!("invalid anon key header value: {e}")))?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key.expose_secret()))
            .map_err(|e| Error::Configuration(format!("invalid anon key header value: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", apikey);
        headers.insert("Authorization", bearer);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            endpoint: function_url,
            model: "proxy".into(),
            timeout: transport.timeout,
        })
    }

    /// The model name requests are issued against (`"proxy"` in proxy mode).
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Generate a JSON document conforming to `schema`.
    ///
    /// The provider returns the document as a string inside the first
    /// candidate; it is parsed here so callers get structured output.
    pub async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<Completion<serde_json::Value>, Error> {
        let resp = self.send(&GenerateRequest::json(prompt, schema)).await?;
        let usage = resp.usage_metadata;
        let text = Self::candidate_text(&resp)?;
        let output = serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: format!("AI output is not valid JSON: {e}"),
            body: text.to_owned(),
        })?;
        Ok(Completion { output, usage })
    }

    /// Generate a typed value: [`generate_json`](Self::generate_json) then
    /// deserialize into `T`.
    pub async fn generate<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<Completion<T>, Error> {
        let Completion { output, usage } = self.generate_json(prompt, schema).await?;
        let body = output.to_string();
        let output = serde_json::from_value(output).map_err(|e| Error::Deserialization {
            message: format!("AI output does not match the expected shape: {e}"),
            body,
        })?;
        Ok(Completion { output, usage })
    }

    /// Generate free text.
    pub async fn generate_text(&self, prompt: &str) -> Result<Completion<String>, Error> {
        let resp = self.send(&GenerateRequest::text(prompt)).await?;
        let output = Self::candidate_text(&resp)?.trim().to_owned();
        Ok(Completion {
            output,
            usage: resp.usage_metadata,
        })
    }

    async fn send(&self, request: &GenerateRequest<'_>) -> Result<GenerateResponse, Error> {
        debug!(model = %self.model, "POST {}", self.endpoint);
        let request = self.http.post(self.endpoint.clone()).json(request);
        let resp = transport::send(request, self.timeout).await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Err(Error::RateLimited { retry_after_secs });
        }

        let body = resp.text().await?;
        if !status.is_success() {
            // Provider errors: {"error": {"code", "message", "status"}}
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(str::to_owned)
                        .or_else(|| {
                            serde_json::from_value::<ErrorResponse>(v)
                                .ok()
                                .and_then(|e| e.text())
                        })
                })
                .unwrap_or_else(|| status.to_string());
            return Err(Error::Ai {
                message,
                status: status.as_u16(),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    fn candidate_text(resp: &GenerateResponse) -> Result<&str, Error> {
        resp.first_text().ok_or_else(|| {
            let reason = resp
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .or_else(|| resp.candidates.first().and_then(|c| c.finish_reason.clone()))
                .unwrap_or_else(|| "no candidates".into());
            Error::Ai {
                message: format!("empty response from model ({reason})"),
                status: 200,
            }
        })
    }
}
