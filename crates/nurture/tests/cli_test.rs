//! Integration tests for the `nurture` CLI binary.
//!
//! These cover argument parsing, help output, shell completions, config
//! handling and the offline paths of the session gate. None of them
//! reach a live backend.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const NOWHERE: &str = "/tmp/nurture-cli-test-nonexistent";

/// Build a [`Command`] for the `nurture` binary rooted at `home`.
///
/// Clears all `NURTURE_*` env vars and points the config and data
/// directories under `home` so tests never touch the user's real files.
fn nurture_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nurture");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("NURTURE_PROFILE")
        .env_remove("NURTURE_BACKEND_URL")
        .env_remove("NURTURE_ANON_KEY")
        .env_remove("NURTURE_OUTPUT")
        .env_remove("NURTURE_TIMEOUT")
        .env_remove("NURTURE_PASSWORD")
        .env_remove("NURTURE_NEW_PASSWORD")
        .env_remove("NURTURE_RECOVERY_TOKEN");
    cmd
}

fn nurture_cmd() -> assert_cmd::Command {
    nurture_in(Path::new(NOWHERE))
}

/// Same as [`nurture_cmd`] with an unconfigured backend supplied by flags.
fn offline_cmd() -> assert_cmd::Command {
    let mut cmd = nurture_cmd();
    cmd.args([
        "--backend-url",
        "http://127.0.0.1:9",
        "--anon-key",
        "test-anon-key",
    ]);
    cmd
}

/// Write a config file with two profiles into `home`.
fn write_config(home: &Path) {
    let dir = home.join("config").join("nurture");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        r#"default_profile = "home"

[profiles.home]
backend_url = "https://abcd.supabase.co"
anon_key = "plaintext-anon-key"
ai_proxy = "generate"

[profiles.work]
backend_url = "https://work.supabase.co"
anon_key_env = "WORK_ANON_KEY"
"#,
    )
    .unwrap();
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = nurture_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    nurture_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("parenting assistant")
            .and(predicate::str::contains("login"))
            .and(predicate::str::contains("plan"))
            .and(predicate::str::contains("meal"))
            .and(predicate::str::contains("admin")),
    );
}

#[test]
fn test_version_flag() {
    nurture_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nurture"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    nurture_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    nurture_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    nurture_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete -c nurture"));
}

// ── Argument errors ─────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = nurture_cmd().arg("teleport").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized subcommand"),
        "Expected clap error in output:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    nurture_cmd()
        .args(["--output", "xml", "status"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("xml"));
}

#[test]
fn test_plan_requires_child_and_age() {
    nurture_cmd()
        .args(["plan", "--child", "Mia"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--age"));
}

#[test]
fn test_password_reset_needs_link_or_token() {
    nurture_cmd()
        .args(["password", "reset"])
        .assert()
        .failure()
        .code(2);
}

// ── Subcommand trees ────────────────────────────────────────────────

#[test]
fn test_admin_subcommands_exist() {
    nurture_cmd().args(["admin", "--help"]).assert().success().stdout(
        predicate::str::contains("stats")
            .and(predicate::str::contains("users"))
            .and(predicate::str::contains("create-user"))
            .and(predicate::str::contains("promote"))
            .and(predicate::str::contains("renewal-url"))
            .and(predicate::str::contains("expiring")),
    );
}

#[test]
fn test_meal_subcommands_exist() {
    nurture_cmd().args(["meal", "--help"]).assert().success().stdout(
        predicate::str::contains("plan").and(predicate::str::contains("recipe")),
    );
}

#[test]
fn test_password_subcommands_exist() {
    nurture_cmd()
        .args(["password", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("forgot").and(predicate::str::contains("reset")));
}

#[test]
fn test_config_subcommands_exist() {
    nurture_cmd().args(["config", "--help"]).assert().success().stdout(
        predicate::str::contains("init")
            .and(predicate::str::contains("show"))
            .and(predicate::str::contains("profiles"))
            .and(predicate::str::contains("use"))
            .and(predicate::str::contains("set-secret")),
    );
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_status_without_config() {
    let output = nurture_cmd().arg("status").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.to_lowercase().contains("config"),
        "Expected config hint in output:\n{text}"
    );
}

#[test]
fn test_backend_url_without_anon_key() {
    nurture_cmd()
        .args(["--backend-url", "https://abcd.supabase.co", "status"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("credentials"));
}

#[test]
fn test_config_show_no_config() {
    nurture_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_path_lists_both_files() {
    let home = tempfile::tempdir().unwrap();
    nurture_in(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("config.toml").and(predicate::str::contains("session.json")),
        );
}

#[test]
fn test_config_show_redacts_secrets() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path());
    nurture_in(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.home]")
                .and(predicate::str::contains("anon_key_env = \"WORK_ANON_KEY\""))
                .and(predicate::str::contains("plaintext-anon-key").not()),
        );
}

#[test]
fn test_config_profiles_marks_default() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path());
    nurture_in(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("home *").and(predicate::str::contains("work")));
}

#[test]
fn test_config_use_switches_default() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path());
    nurture_in(home.path())
        .args(["config", "use", "work"])
        .assert()
        .success();
    nurture_in(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work *"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path());
    nurture_in(home.path())
        .args(["config", "use", "cabin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cabin").and(predicate::str::contains("home, work")));
}

#[test]
fn test_unknown_profile_flag() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path());
    nurture_in(home.path())
        .args(["--profile", "cabin", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cabin"));
}

// ── Offline session gate ────────────────────────────────────────────

#[test]
fn test_status_signed_out_lands_on_login() {
    let home = tempfile::tempdir().unwrap();
    let mut cmd = nurture_in(home.path());
    cmd.args([
        "--backend-url",
        "http://127.0.0.1:9",
        "--anon-key",
        "test-anon-key",
        "-o",
        "json",
        "status",
        "--no-refresh",
    ]);
    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("\"screen\": \"login\"")
                .and(predicate::str::contains("\"signed_in\": false")),
        );
}

#[test]
fn test_history_requires_sign_in() {
    offline_cmd()
        .args(["history", "planner"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn test_admin_requires_sign_in() {
    offline_cmd()
        .args(["admin", "stats"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_plan_without_ai_access() {
    offline_cmd()
        .args(["plan", "--child", "Mia", "--age", "3"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("AI"));
}
