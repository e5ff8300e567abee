//! Shared configuration for the nurture CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! the on-disk session store, and translation to
//! `nurture_core::ServiceConfig`. The CLI layers its flag overrides on top.

mod session_store;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use nurture_core::{AiAccess, ServiceConfig, TlsVerification};

pub use session_store::FileSessionStore;

/// Keyring service every stored secret lives under.
pub const KEYRING_SERVICE: &str = "nurture";

/// Backend function used when a profile enables the AI proxy without
/// naming one.
pub const DEFAULT_AI_PROXY_FUNCTION: &str = "generate";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, listing the configured names on a miss.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    /// Sorted, comma-separated profile names (`(none)` when empty).
    pub fn profile_names(&self) -> String {
        let mut names: Vec<_> = self.profiles.keys().map(String::as_str).collect();
        if names.is_empty() {
            return "(none)".into();
        }
        names.sort_unstable();
        names.join(", ")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Project URL (e.g., "https://abcd.supabase.co").
    pub backend_url: String,

    /// Public anon key (plaintext; prefer keyring or env var).
    pub anon_key: Option<String>,

    /// Environment variable name containing the anon key.
    pub anon_key_env: Option<String>,

    /// Public site URL used to build password-reset links.
    pub site_url: Option<String>,

    /// Generative-AI API key (plaintext; prefer keyring or env var).
    pub ai_api_key: Option<String>,

    /// Environment variable name containing the AI API key.
    pub ai_api_key_env: Option<String>,

    /// Override the AI model.
    pub ai_model: Option<String>,

    /// Override the AI provider endpoint.
    pub ai_base_url: Option<String>,

    /// Route AI requests through this backend function instead of
    /// calling the provider directly.
    pub ai_proxy: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("app", "nurture", "nurture")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the last successful login is persisted.
pub fn session_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("session.json"),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("nurture");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. Environment keys use `__` to nest, e.g.
/// `NURTURE_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NURTURE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret sources ──────────────────────────────────────────────────

/// The two secrets a profile can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSlot {
    AnonKey,
    AiApiKey,
}

impl SecretSlot {
    /// Keyring account name for this slot under `profile_name`.
    pub fn account(self, profile_name: &str) -> String {
        match self {
            Self::AnonKey => format!("{profile_name}/anon-key"),
            Self::AiApiKey => format!("{profile_name}/ai-api-key"),
        }
    }
}

/// Where secrets are looked up. `SystemSecrets` reads the process
/// environment and the OS keyring.
pub trait SecretSource {
    fn env(&self, name: &str) -> Option<String>;
    fn keyring(&self, account: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSecrets;

impl SecretSource for SystemSecrets {
    fn env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn keyring(&self, account: &str) -> Option<String> {
        keyring::Entry::new(KEYRING_SERVICE, account)
            .and_then(|entry| entry.get_password())
            .ok()
    }
}

/// Store a secret in the OS keyring for `profile_name`.
pub fn store_secret(profile_name: &str, slot: SecretSlot, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &slot.account(profile_name))
        .map_err(|e| ConfigError::Keyring(format!("failed to access keyring: {e}")))?;
    entry
        .set_password(value)
        .map_err(|e| ConfigError::Keyring(format!("failed to store secret: {e}")))
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve one secret: named env var, then keyring, then plaintext.
/// `None` when none of them yields a non-empty value.
pub fn resolve_secret(
    profile: &Profile,
    profile_name: &str,
    slot: SecretSlot,
    source: &dyn SecretSource,
) -> Option<SecretString> {
    let (env_name, plaintext) = match slot {
        SecretSlot::AnonKey => (&profile.anon_key_env, &profile.anon_key),
        SecretSlot::AiApiKey => (&profile.ai_api_key_env, &profile.ai_api_key),
    };

    // 1. Profile's env var
    if let Some(val) = env_name
        .as_deref()
        .and_then(|name| source.env(name))
        .filter(|v| !v.is_empty())
    {
        return Some(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(val) = source
        .keyring(&slot.account(profile_name))
        .filter(|v| !v.is_empty())
    {
        return Some(SecretString::from(val));
    }

    // 3. Plaintext in config
    plaintext
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.clone()))
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected an http(s) URL, got {raw}"),
        });
    }
    Ok(url)
}

fn resolve_ai(
    profile: &Profile,
    profile_name: &str,
    source: &dyn SecretSource,
) -> Result<AiAccess, ConfigError> {
    if let Some(function) = &profile.ai_proxy {
        let function = function.trim();
        return Ok(AiAccess::Proxy {
            function: if function.is_empty() {
                DEFAULT_AI_PROXY_FUNCTION.into()
            } else {
                function.into()
            },
        });
    }

    let Some(api_key) = resolve_secret(profile, profile_name, SecretSlot::AiApiKey, source) else {
        return Ok(AiAccess::Disabled);
    };

    let mut access = AiAccess::direct(api_key);
    if let AiAccess::Direct {
        model, base_url, ..
    } = &mut access
    {
        if let Some(m) = profile.ai_model.as_ref().filter(|m| !m.is_empty()) {
            model.clone_from(m);
        }
        if let Some(raw) = &profile.ai_base_url {
            *base_url = parse_url("ai_base_url", raw)?.to_string();
        }
    }
    Ok(access)
}

/// Build a `ServiceConfig` from a profile, reading secrets from `source`.
///
/// This is the single boundary where config types cross into core types.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    source: &dyn SecretSource,
) -> Result<ServiceConfig, ConfigError> {
    if profile.backend_url.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "backend_url".into(),
            reason: format!("profile '{profile_name}' has no backend URL"),
        });
    }
    let backend_url = parse_url("backend_url", profile.backend_url.trim())?;

    let anon_key = resolve_secret(profile, profile_name, SecretSlot::AnonKey, source).ok_or_else(
        || ConfigError::NoCredentials {
            profile: profile_name.into(),
        },
    )?;

    let mut cfg = ServiceConfig::new(backend_url, anon_key);
    cfg.site_url = profile
        .site_url
        .as_deref()
        .map(|raw| parse_url("site_url", raw))
        .transpose()?;
    cfg.ai = resolve_ai(profile, profile_name, source)?;
    if let Some(ca_path) = &profile.ca_cert {
        cfg.tls = TlsVerification::CustomCa(ca_path.clone());
    }
    if let Some(secs) = profile.timeout {
        cfg.timeout = Duration::from_secs(secs);
    }
    Ok(cfg)
}

/// `resolve_profile` against the process environment and OS keyring.
pub fn profile_to_service_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ServiceConfig, ConfigError> {
    resolve_profile(profile, profile_name, &SystemSecrets)
}
