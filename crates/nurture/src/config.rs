//! CLI configuration: thin wrapper around `nurture_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--backend-url, --anon-key, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use nurture_core::ServiceConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nurture_config::{
    Config, FileSessionStore, Profile, SecretSlot, config_path, load_config_or_default,
    save_config, session_path, store_secret,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `ServiceConfig` for this invocation.
///
/// A configured profile is resolved through the shared credential chain,
/// then flag overrides are applied. Without a profile, `--backend-url`
/// and `--anon-key` alone are enough.
pub fn resolve_service_config(global: &GlobalOpts) -> Result<(String, ServiceConfig), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut service = if let Some(profile) = cfg.profiles.get(&profile_name) {
        let mut profile = profile.clone();
        profile.timeout = profile.timeout.or(Some(cfg.defaults.timeout));
        if let Some(url) = &global.backend_url {
            profile.backend_url.clone_from(url);
        }
        if let Some(key) = &global.anon_key {
            profile.anon_key = Some(key.clone());
            profile.anon_key_env = None;
        }
        nurture_config::profile_to_service_config(&profile, &profile_name)?
    } else if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: cfg.profile_names(),
        });
    } else {
        let url_str = global.backend_url.as_deref().ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
        let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
            field: "backend_url".into(),
            reason: format!("invalid URL: {url_str}"),
        })?;
        let key = global
            .anon_key
            .clone()
            .ok_or_else(|| CliError::NoCredentials {
                profile: profile_name.clone(),
            })?;
        let mut service = ServiceConfig::new(url, SecretString::from(key));
        service.timeout = Duration::from_secs(cfg.defaults.timeout);
        service
    };

    if let Some(secs) = global.timeout {
        service.timeout = Duration::from_secs(secs);
    }

    Ok((profile_name, service))
}
