//! Family profile setup and display.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use nurture_core::{
    Address, ChildDetails, FamilyProfile, IdentityBackend, Role, Screen, SetupStatus,
    SpouseDetails, route,
};

use crate::cli::{GlobalOpts, ProfileArgs, ProfileCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

const GENDERS: &[&str] = &["Skip", "Male", "Female", "Other"];
const CHILD_GENDERS: &[&str] = &["Boy", "Girl", "Other"];
const LANGUAGES: &[&str] = &["English", "Spanish", "French", "German", "Hindi", "Chinese"];

#[derive(Debug, Serialize)]
struct ProfileView {
    email: String,
    role: Role,
    setup_status: SetupStatus,
    display_name: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

pub async fn handle(ctx: &Context, args: ProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ProfileCommand::Setup { from_file } => {
            let state = ctx.snapshot();
            match route(&state) {
                Screen::Login | Screen::PasswordReset | Screen::Loading => {
                    return Err(CliError::NotSignedIn);
                }
                Screen::AdminDashboard => {
                    output::print_status(
                        &ctx.painter
                            .warning("Admin accounts do not need a family profile; saving anyway"),
                        global.quiet,
                    );
                }
                Screen::UserDashboard => {
                    if from_file.is_none()
                        && !util::confirm("Your profile is already complete. Replace it?", global.yes)?
                    {
                        return Ok(());
                    }
                }
                Screen::ProfileSetup => {}
            }

            let profile = match from_file {
                Some(path) => util::read_json_file::<FamilyProfile>(&path)?,
                None => wizard(ctx)?,
            };
            profile.validate().map_err(|reason| CliError::Validation {
                field: "profile".into(),
                reason,
            })?;

            let spinner = util::spinner("Saving profile...", global.quiet);
            let result = ctx.resolver.submit_profile_completion(&profile).await;
            spinner.finish_and_clear();
            let state = result?;

            output::print_status(
                &ctx.painter.success(&format!(
                    "Profile saved for {} (screen: {})",
                    profile.full_name,
                    route(&state)
                )),
                global.quiet,
            );
            Ok(())
        }

        ProfileCommand::Show => {
            ctx.resolver.wait_for_refresh().await;
            let state = ctx.snapshot();
            let identity = state.identity().ok_or(CliError::NotSignedIn)?;

            let stored = match ctx.backend.lookup_profile_by_identity(&identity.id).await? {
                Some(profile) => Some(profile),
                None => ctx.backend.lookup_profile_by_email(&identity.email).await?,
            };
            let stored = stored.unwrap_or_default();

            let view = ProfileView {
                email: identity.email.clone(),
                role: state.role(),
                setup_status: state.setup_status(),
                display_name: stored.display_name,
                created_at: stored.created_at,
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| {
                    output::detail_lines(&[
                        ("Email", v.email.clone()),
                        ("Name", util::or_dash(v.display_name.as_deref())),
                        ("Role", v.role.to_string()),
                        ("Setup", v.setup_status.to_string()),
                        ("Member since", util::short_date(v.created_at)),
                    ])
                },
                |v| v.email.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

// ── Interactive wizard ──────────────────────────────────────────────

fn wizard(ctx: &Context) -> Result<FamilyProfile, CliError> {
    eprintln!("{}", ctx.painter.heading("About you"));
    let full_name = util::prompt_text("Full name")?;
    let gender = optional_choice("Gender", GENDERS)?;
    let age = util::prompt_optional("Age")?
        .map(|raw| parse_number("age", &raw))
        .transpose()?;
    let phone = util::prompt_optional("Phone")?;

    eprintln!("{}", ctx.painter.heading("Your partner"));
    let spouse = match util::prompt_optional("Partner's name")? {
        Some(name) => Some(SpouseDetails {
            name,
            gender: optional_choice("Partner's gender", GENDERS)?,
            age: util::prompt_optional("Partner's age")?
                .map(|raw| parse_number("partner's age", &raw))
                .transpose()?,
        }),
        None => None,
    };

    eprintln!("{}", ctx.painter.heading("Address"));
    let address = Address {
        street: util::prompt_optional("Street address")?,
        district: util::prompt_optional("District")?,
        state: util::prompt_optional("State")?,
        pincode: util::prompt_optional("PIN code")?,
    };

    eprintln!("{}", ctx.painter.heading("Your child"));
    let child = ChildDetails {
        name: util::prompt_text("Child's name")?,
        gender: Some(
            child_gender_value(&util::prompt_select("Child's gender", CHILD_GENDERS, 0)?)
                .to_owned(),
        ),
        date_of_birth: util::prompt_optional("Date of birth (YYYY-MM-DD)")?
            .map(|raw| parse_date(&raw))
            .transpose()?,
    };

    let preferred_language = util::prompt_select("Preferred language", LANGUAGES, 0)?;

    Ok(FamilyProfile {
        full_name,
        gender,
        age,
        phone,
        spouse,
        address,
        child,
        preferred_language,
    })
}

/// Stored values for the child's gender choices.
fn child_gender_value(label: &str) -> &'static str {
    match label {
        "Boy" => "male",
        "Girl" => "female",
        _ => "other",
    }
}

fn optional_choice(label: &str, items: &[&str]) -> Result<Option<String>, CliError> {
    let choice = util::prompt_select(label, items, 0)?;
    Ok((choice != "Skip").then(|| choice.to_lowercase()))
}

fn parse_number(field: &str, raw: &str) -> Result<u32, CliError> {
    raw.trim().parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("expected a whole number, got '{raw}'"),
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| CliError::Validation {
        field: "date of birth".into(),
        reason: format!("expected YYYY-MM-DD, got '{raw}'"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_wizard_inputs() {
        assert_eq!(parse_number("age", " 31 ").unwrap(), 31);
        assert!(parse_number("age", "thirty").is_err());
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("29/02/2024").is_err());
    }

    #[test]
    fn child_gender_maps_to_stored_values() {
        assert_eq!(child_gender_value("Boy"), "male");
        assert_eq!(child_gender_value("Girl"), "female");
        assert_eq!(child_gender_value("Other"), "other");
    }
}
