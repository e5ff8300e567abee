// ── Runtime service configuration ──
//
// These types describe *how* to reach the hosted backend and the AI
// service. They carry credential data and connection tuning, but never
// touch disk. The CLI constructs a `ServiceConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use nurture_api::ai::{DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL};
use nurture_api::transport::{TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
}

/// How generative-AI requests are issued.
#[derive(Debug, Clone, Default)]
pub enum AiAccess {
    /// Call the provider directly with an API key.
    Direct {
        api_key: SecretString,
        model: String,
        base_url: String,
    },
    /// Call a backend function that holds the provider key.
    Proxy { function: String },
    /// No AI access configured; tool commands are refused.
    #[default]
    Disabled,
}

impl AiAccess {
    /// Direct access with the default provider endpoint and model.
    pub fn direct(api_key: SecretString) -> Self {
        Self::Direct {
            api_key,
            model: DEFAULT_AI_MODEL.into(),
            base_url: DEFAULT_AI_BASE_URL.into(),
        }
    }
}

/// Configuration for one backend project.
///
/// Built by the CLI, passed to the services -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Project URL (e.g., `https://abcd.supabase.co`).
    pub backend_url: Url,
    /// Public anon key sent with every request.
    pub anon_key: SecretString,
    /// Public site URL; password-reset links land on `{site_url}/reset-password`.
    pub site_url: Option<Url>,
    pub ai: AiAccess,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(backend_url: Url, anon_key: SecretString) -> Self {
        Self {
            backend_url,
            anon_key,
            site_url: None,
            ai: AiAccess::Disabled,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            },
            timeout: self.timeout,
        }
    }

    /// Where an emailed recovery link should land.
    pub fn password_reset_redirect(&self) -> Option<Url> {
        self.site_url
            .as_ref()
            .and_then(|site| site.join("reset-password").ok())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reset_redirect_joins_site_url() {
        let mut cfg = ServiceConfig::new(
            "https://p.example.co".parse().unwrap(),
            SecretString::from("anon".to_string()),
        );
        assert!(cfg.password_reset_redirect().is_none());

        cfg.site_url = Some("https://app.example.com/".parse().unwrap());
        assert_eq!(
            cfg.password_reset_redirect().unwrap().as_str(),
            "https://app.example.com/reset-password"
        );
    }
}
