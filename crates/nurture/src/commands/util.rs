//! Shared helpers for command handlers: prompts, spinners, file input.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use serde::de::DeserializeOwned;

use nurture_core::admin::MIN_PASSWORD_CHARS;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(CliError::prompt)
}

/// Required free-text prompt.
pub fn prompt_text(label: &str) -> Result<String, CliError> {
    let value: String = Input::new()
        .with_prompt(label)
        .interact_text()
        .map_err(CliError::prompt)?;
    Ok(value.trim().to_owned())
}

/// Optional free-text prompt; empty input is `None`.
pub fn prompt_optional(label: &str) -> Result<Option<String>, CliError> {
    let value: String = Input::new()
        .with_prompt(format!("{label} (optional)"))
        .allow_empty(true)
        .interact_text()
        .map_err(CliError::prompt)?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_owned()))
}

/// Pick one of `items`; returns the chosen label.
pub fn prompt_select(label: &str, items: &[&str], default: usize) -> Result<String, CliError> {
    let idx = Select::new()
        .with_prompt(label)
        .items(items)
        .default(default)
        .interact()
        .map_err(CliError::prompt)?;
    Ok(items.get(idx).copied().unwrap_or_default().to_owned())
}

/// Read a secret from `env_var` if set, otherwise prompt without echo.
pub fn secret_from_env_or_prompt(env_var: &str, prompt: &str) -> Result<SecretString, CliError> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Ok(SecretString::from(value));
        }
    }
    let value = rpassword::prompt_password(prompt).map_err(CliError::prompt)?;
    if value.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(SecretString::from(value))
}

/// Prompt twice for a new password and enforce the minimum length.
pub fn new_password(prompt: &str) -> Result<SecretString, CliError> {
    let value = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Repeat password", "Passwords do not match")
        .validate_with(|input: &String| -> Result<(), String> {
            if input.chars().count() < MIN_PASSWORD_CHARS {
                Err(format!("use at least {MIN_PASSWORD_CHARS} characters"))
            } else {
                Ok(())
            }
        })
        .interact()
        .map_err(CliError::prompt)?;
    Ok(SecretString::from(value))
}

/// Spinner on stderr while a remote call runs. Hidden in quiet mode or
/// when stderr is not a terminal.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON in {}: {e}", path.display()),
    })
}

/// Empty cell for a missing value.
pub fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_owned()
}

/// `YYYY-MM-DD` for table cells.
pub fn short_date(value: Option<chrono::DateTime<chrono::Utc>>) -> String {
    value.map_or_else(|| "-".into(), |d| d.format("%Y-%m-%d").to_string())
}
