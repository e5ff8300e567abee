//! Sign-in, sign-out, status, deep links and password recovery.

use secrecy::SecretString;
use serde::Serialize;

use nurture_core::{Navigation, Role, Screen, SessionState, SetupStatus, route};

use crate::cli::{GlobalOpts, LoginArgs, PasswordArgs, PasswordCommand, StatusArgs};
use crate::error::{CliError, renewal_hint};
use crate::output::{self, Painter};

use super::{Context, util};

// ── Status view ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StatusView {
    profile: String,
    screen: Screen,
    signed_in: bool,
    user_id: Option<String>,
    email: Option<String>,
    role: Role,
    setup_status: SetupStatus,
    recovery_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    renewal_url: Option<String>,
}

impl StatusView {
    fn new(profile: &str, state: &SessionState) -> Self {
        Self {
            profile: profile.to_owned(),
            screen: route(state),
            signed_in: state.is_signed_in(),
            user_id: state.identity().map(|i| i.id.to_string()),
            email: state.identity().map(|i| i.email.clone()),
            role: state.role(),
            setup_status: state.setup_status(),
            recovery_mode: state.is_recovery_mode(),
            renewal_url: state
                .subscription_expired()
                .and_then(|e| e.renewal_url.clone()),
        }
    }

    fn detail(&self) -> String {
        let mut pairs = vec![
            ("Profile", self.profile.clone()),
            ("Screen", self.screen.to_string()),
        ];
        match (&self.email, &self.user_id) {
            (Some(email), Some(id)) => pairs.push(("User", format!("{email} ({id})"))),
            _ => pairs.push(("User", "not signed in".into())),
        }
        if self.signed_in {
            pairs.push(("Role", self.role.to_string()));
            pairs.push(("Setup", self.setup_status.to_string()));
        }
        if self.recovery_mode {
            pairs.push(("Recovery", "password reset link".into()));
        }
        output::detail_lines(&pairs)
    }
}

/// Suggest the next command for the screen the session landed on.
fn next_step(screen: Screen) -> Option<&'static str> {
    match screen {
        Screen::Login => Some("Sign in with: nurture login"),
        Screen::ProfileSetup => Some("Finish your family profile: nurture profile setup"),
        Screen::PasswordReset => Some("Set a new password: nurture password reset --link <link>"),
        Screen::Loading | Screen::UserDashboard | Screen::AdminDashboard => None,
    }
}

fn print_state(ctx: &Context, state: &SessionState, global: &GlobalOpts) {
    let view = StatusView::new(&ctx.profile_name, state);
    let out = output::render_single(
        &global.output,
        &view,
        StatusView::detail,
        |v| v.screen.to_string(),
    );
    output::print_output(&out, global.quiet);
}

fn print_next_step(painter: Painter, screen: Screen, quiet: bool) {
    if let Some(hint) = next_step(screen) {
        output::print_status(&painter.dim(hint), quiet);
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn login(ctx: &Context, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let email = match args.email {
        Some(email) => email,
        None => util::prompt_text("Email")?,
    };
    let password = util::secret_from_env_or_prompt("NURTURE_PASSWORD", "Password: ")?;

    let spinner = util::spinner("Signing in...", global.quiet);
    let result = ctx.resolver.submit_login(&email, &password).await;
    spinner.finish_and_clear();
    let state = result?;

    let screen = route(&state);
    let who = state.identity().map_or(email.as_str(), |i| i.email.as_str());
    output::print_status(
        &ctx.painter.success(&format!("Signed in as {who} ({})", state.role())),
        global.quiet,
    );
    print_state(ctx, &state, global);
    print_next_step(ctx.painter, screen, global.quiet);
    Ok(())
}

pub async fn logout(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let was_signed_in = ctx.snapshot().is_signed_in();
    ctx.resolver.submit_logout().await?;
    let message = if was_signed_in {
        "Signed out"
    } else {
        "No active session"
    };
    output::print_status(&ctx.painter.success(message), global.quiet);
    Ok(())
}

pub async fn status(ctx: &Context, args: &StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut lapsed = false;
    if !args.no_refresh {
        ctx.resolver.wait_for_refresh().await;
        lapsed = ctx.subscription_lapsed().await?;
    }
    let state = ctx.snapshot();
    print_state(ctx, &state, global);
    if lapsed {
        let renewal_url = state
            .subscription_expired()
            .and_then(|e| e.renewal_url.as_deref());
        expired_notice(ctx.painter, renewal_url, global.quiet);
    } else {
        print_next_step(ctx.painter, route(&state), global.quiet);
    }
    Ok(())
}

pub async fn open(
    ctx: &Context,
    navigation: &Navigation,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = ctx.snapshot();
    if route(&state) == Screen::PasswordReset {
        return reset_password(ctx, navigation.recovery_token(), global).await;
    }
    ctx.resolver.wait_for_refresh().await;
    let state = ctx.snapshot();
    print_state(ctx, &state, global);
    print_next_step(ctx.painter, route(&state), global.quiet);
    Ok(())
}

pub async fn password(
    ctx: &Context,
    args: PasswordArgs,
    navigation: &Navigation,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PasswordCommand::Forgot { email } => {
            let spinner = util::spinner("Requesting reset link...", global.quiet);
            let result = ctx.resolver.request_password_reset(&email).await;
            spinner.finish_and_clear();
            result?;
            output::print_status(
                &ctx.painter.success(&format!(
                    "If an account exists for {email}, a reset link is on its way"
                )),
                global.quiet,
            );
            Ok(())
        }

        PasswordCommand::Reset { link: _, token } => {
            let token = token.as_deref().or_else(|| navigation.recovery_token());
            reset_password(ctx, token, global).await
        }
    }
}

async fn reset_password(
    ctx: &Context,
    token: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CliError::Validation {
            field: "link".into(),
            reason: "the link carries no recovery token; request a new one with: \
                     nurture password forgot <email>"
                .into(),
        })?;
    let token = SecretString::from(token.to_owned());

    let new_password = util::new_password("New password")?;
    let spinner = util::spinner("Updating password...", global.quiet);
    let result = ctx
        .resolver
        .complete_password_reset(&token, &new_password)
        .await;
    spinner.finish_and_clear();
    result?;

    output::print_status(
        &ctx.painter
            .success("Password updated. Sign in with: nurture login"),
        global.quiet,
    );
    Ok(())
}

/// Shown when a signed-in session turns out to have lapsed.
fn expired_notice(painter: Painter, renewal_url: Option<&str>, quiet: bool) {
    output::print_status(
        &painter.warning(&format!(
            "Your subscription has expired. {}",
            renewal_hint(renewal_url)
        )),
        quiet,
    );
}
