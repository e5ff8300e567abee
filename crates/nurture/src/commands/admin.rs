//! Admin dashboard handlers: usage, accounts, subscriptions.

use serde::Serialize;
use tabled::Tabled;

use nurture_core::model::ToolUsage;
use nurture_core::{CreatedUser, SubscriptionStatus, UsageStats, UserSummary};

use crate::cli::{AdminArgs, AdminCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&UserSummary> for UserRow {
    fn from(u: &UserSummary) -> Self {
        Self {
            email: u.email.clone(),
            name: util::or_dash(u.name.as_deref()),
            role: u.role.to_string(),
            status: util::or_dash(u.status.as_deref()),
            expires: util::short_date(u.subscription_expiry),
            created: util::short_date(u.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct RenewalUrlView {
    renewal_url: Option<String>,
}

// ── Detail renderers ────────────────────────────────────────────────

fn usage_cell(usage: &ToolUsage) -> String {
    format!(
        "{} today, {} this month, {} total",
        usage.today, usage.this_month, usage.total
    )
}

fn stats_detail(s: &UsageStats) -> String {
    output::detail_lines(&[
        ("Registered", s.registered_users.to_string()),
        ("Active", s.active_users.to_string()),
        ("Expired", s.expired_users.to_string()),
        ("Renewed", s.renewed_users.to_string()),
        ("Expiring soon", s.expiring_soon.to_string()),
        ("Admins", s.admin_users.to_string()),
        ("Tool runs", s.total_logs.to_string()),
        ("Planner", usage_cell(&s.planner)),
        ("Meals", usage_cell(&s.meal)),
        ("Check-ins", usage_cell(&s.emotion)),
        (
            "AI cost",
            format!(
                "${:.2} today, ${:.2} this month, ${:.2} total",
                s.ai_cost.today, s.ai_cost.this_month, s.ai_cost.total
            ),
        ),
        ("Updated", util::short_date(s.last_updated)),
    ])
}

fn subscription_detail(s: &SubscriptionStatus) -> String {
    output::detail_lines(&[
        ("Active", if s.is_active { "yes" } else { "no" }.into()),
        ("Status", util::or_dash(s.status.as_deref())),
        ("Expires", util::short_date(s.expiry)),
        (
            "Remaining",
            s.remaining_days
                .map_or_else(|| "-".into(), |d| format!("{d} days")),
        ),
        (
            "Renewal",
            if s.renewal_needed { "needed" } else { "not needed" }.into(),
        ),
    ])
}

fn created_detail(c: &CreatedUser) -> String {
    output::detail_lines(&[
        ("ID", c.id.clone()),
        ("Email", c.email.clone()),
        ("Role", c.role.to_string()),
        ("Expires", util::short_date(Some(c.subscription_expiry))),
    ])
}

fn print_users(users: &[UserSummary], empty: &str, ctx: &Context, global: &GlobalOpts) {
    if users.is_empty() && matches!(global.output, crate::cli::OutputFormat::Table) {
        output::print_status(&ctx.painter.dim(empty), global.quiet);
        return;
    }
    let out = output::render_list(
        &global.output,
        users,
        |u| UserRow::from(u),
        |u| u.email.clone(),
    );
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(ctx: &Context, args: AdminArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let admin = ctx.admin();
    ctx.resolver.wait_for_refresh().await;
    let state = ctx.snapshot();

    match args.command {
        AdminCommand::Stats => {
            let spinner = util::spinner("Collecting usage...", global.quiet);
            let result = admin.usage_stats(&state).await;
            spinner.finish_and_clear();
            let stats = result?;
            let out = output::render_single(&global.output, &stats, stats_detail, |s| {
                s.registered_users.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AdminCommand::Users => {
            let users = admin.list_users(&state).await?;
            print_users(&users, "No registered accounts", ctx, global);
            Ok(())
        }

        AdminCommand::CreateUser { email, role } => {
            let password = match std::env::var("NURTURE_NEW_PASSWORD") {
                Ok(value) if !value.is_empty() => secrecy::SecretString::from(value),
                _ => util::new_password(&format!("Password for {email}"))?,
            };
            let spinner = util::spinner("Creating account...", global.quiet);
            let result = admin
                .create_user(&state, &email, &password, role.into())
                .await;
            spinner.finish_and_clear();
            let created = result?;

            output::print_status(
                &ctx.painter
                    .success(&format!("Created {} ({})", created.email, created.role)),
                global.quiet,
            );
            let out = output::render_single(&global.output, &created, created_detail, |c| {
                c.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AdminCommand::Promote { email } => {
            if !util::confirm(&format!("Grant admin access to {email}?"), global.yes)? {
                return Ok(());
            }
            admin.promote_user(&state, &email).await?;
            output::print_status(
                &ctx.painter.success(&format!("{email} is now an admin")),
                global.quiet,
            );
            Ok(())
        }

        AdminCommand::RenewalUrl { url: Some(url) } => {
            admin.set_renewal_url(&state, &url).await?;
            output::print_status(
                &ctx.painter.success("Renewal link updated"),
                global.quiet,
            );
            Ok(())
        }

        AdminCommand::RenewalUrl { url: None } => {
            let view = RenewalUrlView {
                renewal_url: admin.renewal_url(&state).await?,
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| util::or_dash(v.renewal_url.as_deref()),
                |v| v.renewal_url.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AdminCommand::Subscription { email } => {
            let status = admin.subscription_status(&state, &email).await?;
            let out = output::render_single(&global.output, &status, subscription_detail, |s| {
                s.status.clone().unwrap_or_else(|| {
                    if s.is_active { "active" } else { "expired" }.into()
                })
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AdminCommand::Renew { email } => {
            if !util::confirm(&format!("Renew the subscription for {email}?"), global.yes)? {
                return Ok(());
            }
            admin.renew_subscription(&state, &email).await?;
            output::print_status(
                &ctx.painter
                    .success(&format!("Subscription renewed for {email}")),
                global.quiet,
            );
            Ok(())
        }

        AdminCommand::Expiring { days } => {
            let users = admin.expiring_soon(&state, days).await?;
            print_users(
                &users,
                &format!("No subscriptions end in the next {days} days"),
                ctx,
                global,
            );
            Ok(())
        }

        AdminCommand::RefreshStatuses => {
            let spinner = util::spinner("Refreshing subscription statuses...", global.quiet);
            let result = admin.refresh_subscription_statuses(&state).await;
            spinner.finish_and_clear();
            result?;
            output::print_status(
                &ctx.painter.success("Subscription statuses refreshed"),
                global.quiet,
            );
            Ok(())
        }
    }
}
