//! Config subcommand handlers.

use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretArg};
use crate::config::{self, Config, Profile, SecretSlot};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking secrets.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "backend_url = \"{}\"", p.backend_url);
        if p.anon_key.is_some() {
            let _ = writeln!(out, "anon_key = \"{REDACTED}\"");
        }
        if let Some(ref env) = p.anon_key_env {
            let _ = writeln!(out, "anon_key_env = \"{env}\"");
        }
        if let Some(ref site) = p.site_url {
            let _ = writeln!(out, "site_url = \"{site}\"");
        }
        if p.ai_api_key.is_some() {
            let _ = writeln!(out, "ai_api_key = \"{REDACTED}\"");
        }
        if let Some(ref env) = p.ai_api_key_env {
            let _ = writeln!(out, "ai_api_key_env = \"{env}\"");
        }
        if let Some(ref model) = p.ai_model {
            let _ = writeln!(out, "ai_model = \"{model}\"");
        }
        if let Some(ref base) = p.ai_base_url {
            let _ = writeln!(out, "ai_base_url = \"{base}\"");
        }
        if let Some(ref proxy) = p.ai_proxy {
            let _ = writeln!(out, "ai_proxy = \"{proxy}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

/// Copy of the config with every plaintext secret masked, for the
/// structured output formats.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for p in cfg.profiles.values_mut() {
        if p.anon_key.is_some() {
            p.anon_key = Some(REDACTED.into());
        }
        if p.ai_api_key.is_some() {
            p.ai_api_key = Some(REDACTED.into());
        }
    }
    cfg
}

fn prompt_secret(prompt: &str, field: &str) -> Result<String, CliError> {
    let value = rpassword::prompt_password(prompt).map_err(CliError::prompt)?;
    if value.trim().is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(value.trim().to_owned())
}

/// Offer to store a secret in the system keyring or return it for the
/// config file.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(
    secret: &str,
    profile_name: &str,
    slot: SecretSlot,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(CliError::prompt)?;

    if selection == 0 {
        config::store_secret(profile_name, slot, secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

fn validate_url(field: &str, raw: &str) -> Result<(), CliError> {
    let parsed = url::Url::parse(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {e}"),
    })?;
    if matches!(parsed.scheme(), "http" | "https") {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: field.into(),
            reason: "must be an http or https URL".into(),
        })
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("Nurture: configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(CliError::prompt)?;

            let backend_url: String = Input::new()
                .with_prompt("Backend project URL")
                .validate_with(|input: &String| {
                    validate_url("backend_url", input).map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(CliError::prompt)?;

            let key = prompt_secret("Anon key: ", "anon_key")?;
            let anon_key =
                prompt_keyring_storage(&key, &profile_name, SecretSlot::AnonKey, "anon key")?;

            let site_url: String = Input::new()
                .with_prompt("Public site URL for reset links (optional)")
                .allow_empty(true)
                .interact_text()
                .map_err(CliError::prompt)?;
            let site_url = site_url.trim().to_owned();
            if !site_url.is_empty() {
                validate_url("site_url", &site_url)?;
            }

            let ai_choices = &[
                "Call the AI provider directly with an API key",
                "Route AI requests through a backend function",
                "Skip (tools disabled)",
            ];
            let ai_selection = Select::new()
                .with_prompt("AI access")
                .items(ai_choices)
                .default(0)
                .interact()
                .map_err(CliError::prompt)?;

            let (ai_api_key, ai_proxy) = match ai_selection {
                0 => {
                    let key = prompt_secret("AI API key: ", "ai_api_key")?;
                    let stored = prompt_keyring_storage(
                        &key,
                        &profile_name,
                        SecretSlot::AiApiKey,
                        "AI API key",
                    )?;
                    (stored, None)
                }
                1 => {
                    let function: String = Input::new()
                        .with_prompt("Function name")
                        .default(nurture_config::DEFAULT_AI_PROXY_FUNCTION.into())
                        .interact_text()
                        .map_err(CliError::prompt)?;
                    (None, Some(function.trim().to_owned()))
                }
                _ => (None, None),
            };

            let profile = Profile {
                backend_url: backend_url.trim().to_owned(),
                anon_key,
                site_url: (!site_url.is_empty()).then_some(site_url),
                ai_api_key,
                ai_proxy,
                ..Profile::default()
            };

            let mut cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() || cfg.default_profile.is_none() {
                cfg.default_profile = Some(profile_name.clone());
            }
            cfg.profiles.insert(profile_name.clone(), profile);
            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Profile: {profile_name}");
            eprintln!("\n  Sign in with: nurture -p {profile_name} login");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("config:  {}", config::config_path().display());
            println!("session: {}", config::session_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: nurture config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            cfg.profile(&name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret { slot } => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            cfg.profile(&profile_name)?;

            let (slot, prompt) = match slot {
                SecretArg::AnonKey => (SecretSlot::AnonKey, "Anon key: "),
                SecretArg::AiApiKey => (SecretSlot::AiApiKey, "AI API key: "),
            };
            let secret = prompt_secret(prompt, &slot.account(&profile_name))?;
            config::store_secret(&profile_name, slot, &secret)?;

            eprintln!("✓ Secret stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                backend_url: "https://abcd.supabase.co".into(),
                anon_key: Some("anon-secret".into()),
                ai_api_key: Some("ai-secret".into()),
                ai_proxy: Some("generate".into()),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn redacted_text_hides_secrets() {
        let out = format_config_redacted(&sample());
        assert!(out.contains("[profiles.home]"));
        assert!(out.contains("backend_url = \"https://abcd.supabase.co\""));
        assert!(out.contains("ai_proxy = \"generate\""));
        assert!(!out.contains("anon-secret"));
        assert!(!out.contains("ai-secret"));
    }

    #[test]
    fn redacted_copy_masks_structured_output() {
        let cfg = redacted(&sample());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("anon-secret"));
        assert!(json.contains(REDACTED));
    }

    #[test]
    fn url_validation_requires_http() {
        assert!(validate_url("backend_url", "https://abcd.supabase.co").is_ok());
        assert!(validate_url("backend_url", "ftp://example.com").is_err());
        assert!(validate_url("backend_url", "not a url").is_err());
    }
}
