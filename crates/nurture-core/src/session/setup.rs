// ── First-run setup heuristic ──
//
// No flag records whether the family wizard ran, so it is inferred: an
// account needs setup when it is recent AND its display name looks
// auto-generated. Both conditions must hold.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Identity, Profile, Role, SetupStatus};

/// Accounts created strictly within this many days count as recent.
pub const RECENT_ACCOUNT_WINDOW_DAYS: i64 = 7;

/// Display names with fewer characters than this look auto-generated.
pub const MIN_DISPLAY_NAME_CHARS: usize = 3;

/// `created_at > now - window`. An account exactly at the edge is not recent.
pub fn is_recent_account(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    created_at.is_some_and(|created| created > now - Duration::days(RECENT_ACCOUNT_WINDOW_DAYS))
}

/// Empty, equal to the email local part, containing `@`, or too short.
///
/// Lengths are counted in Unicode scalar values; comparison with the
/// email local part is exact.
pub fn looks_auto_generated(display_name: Option<&str>, email: &str) -> bool {
    let Some(name) = display_name else {
        return true;
    };
    let local_part = email.split('@').next().unwrap_or(email);
    name.is_empty()
        || name == local_part
        || name.contains('@')
        || name.chars().count() < MIN_DISPLAY_NAME_CHARS
}

/// Decide setup status from an already-looked-up profile.
///
/// `profile == None` means no record exists anywhere: non-admins need setup.
pub fn setup_status_for(
    identity: &Identity,
    role: Role,
    profile: Option<&Profile>,
    now: DateTime<Utc>,
) -> SetupStatus {
    if role.is_admin() {
        return SetupStatus::Complete;
    }
    let Some(profile) = profile else {
        return SetupStatus::NeedsProfileSetup;
    };
    if is_recent_account(profile.created_at, now)
        && looks_auto_generated(profile.display_name.as_deref(), &identity.email)
    {
        SetupStatus::NeedsProfileSetup
    } else {
        SetupStatus::Complete
    }
}
