// ── Record-to-domain conversions ──
//
// Bridges raw `nurture_api` row types into canonical `nurture_core::model`
// types and back. Accounts created by different provisioning paths fill
// different columns; everything here tolerates the gaps.

use nurture_api::backend::{
    AdminStatsRecord, AppUserRecord, EmotionLogRecord, JsonRunRecord, PlannerRunRecord,
    SubscriptionStatusRecord, UserProfileRecord,
};
use serde_json::Value;

use crate::model::{
    AiCost, FamilyProfile, HistoryEntry, Identity, Profile, Role, SubscriptionStatus, ToolKind,
    ToolUsage, UsageStats, UserSummary,
};

// ── Helpers ────────────────────────────────────────────────────────

/// `numeric` columns arrive as JSON numbers or strings.
fn parse_cost(raw: Option<&Value>) -> f64 {
    match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn capitalize_first(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

// ── Profiles ───────────────────────────────────────────────────────

impl From<AppUserRecord> for Profile {
    fn from(r: AppUserRecord) -> Self {
        Self {
            role: Role::from_stored(r.role.as_deref()),
            display_name: non_blank(r.name),
            created_at: r.created_at,
        }
    }
}

impl From<UserProfileRecord> for Profile {
    fn from(r: UserProfileRecord) -> Self {
        Self {
            role: Role::from_stored(r.role.as_deref()),
            display_name: non_blank(r.full_name).or_else(|| non_blank(r.name)),
            created_at: r.created_at,
        }
    }
}

/// The `user_profiles` row written when the setup wizard completes.
pub(crate) fn profile_record(identity: &Identity, profile: &FamilyProfile) -> UserProfileRecord {
    let spouse = profile.spouse.as_ref();
    UserProfileRecord {
        auth_user_id: Some(identity.id.to_string()),
        email: Some(identity.email.clone()),
        name: Some(profile.full_name.trim().to_owned()),
        gender: profile.gender.as_deref().map(capitalize_first),
        age: profile.age,
        phone: non_blank(profile.phone.clone()),
        spouse_name: spouse.map(|s| s.name.trim().to_owned()),
        spouse_gender: spouse.and_then(|s| s.gender.as_deref()).map(capitalize_first),
        spouse_age: spouse.and_then(|s| s.age),
        street: non_blank(profile.address.street.clone()),
        district: non_blank(profile.address.district.clone()),
        state: non_blank(profile.address.state.clone()),
        pincode: non_blank(profile.address.pincode.clone()),
        baby_name: Some(profile.child.name.trim().to_owned()),
        baby_gender: profile.child.gender.as_deref().map(capitalize_first),
        baby_date_of_birth: profile.child.date_of_birth.map(|d| d.to_string()),
        preferred_language: Some(profile.preferred_language.clone()),
        setup_completed: Some(true),
        ..UserProfileRecord::default()
    }
}

// ── Subscription ───────────────────────────────────────────────────

impl From<SubscriptionStatusRecord> for SubscriptionStatus {
    fn from(r: SubscriptionStatusRecord) -> Self {
        let is_active = r.is_active.unwrap_or(true);
        Self {
            is_active,
            remaining_days: r.subscription_remaining_days,
            expiry: r.subscription_expiry_date,
            status: r.status,
            renewal_needed: r.renewal_needed.unwrap_or(!is_active),
        }
    }
}

// ── Admin ──────────────────────────────────────────────────────────

impl From<AdminStatsRecord> for UsageStats {
    fn from(r: AdminStatsRecord) -> Self {
        Self {
            registered_users: r.registered_users.unwrap_or(0),
            active_users: r.active_users.unwrap_or(0),
            expired_users: r.expired_users.unwrap_or(0),
            renewed_users: r.renewed_users.unwrap_or(0),
            expiring_soon: r.expiring_soon.unwrap_or(0),
            admin_users: r.admin_users.unwrap_or(0),
            total_logs: r.total_logs.unwrap_or(0),
            planner: ToolUsage {
                today: r.planner_day.unwrap_or(0),
                this_month: r.planner_month.unwrap_or(0),
                total: r.planner_total.unwrap_or(0),
            },
            meal: ToolUsage {
                today: r.meal_day.unwrap_or(0),
                this_month: r.meal_month.unwrap_or(0),
                total: r.meal_total.unwrap_or(0),
            },
            emotion: ToolUsage {
                today: r.emotion_day.unwrap_or(0),
                this_month: r.emotion_month.unwrap_or(0),
                total: r.emotion_total.unwrap_or(0),
            },
            ai_cost: AiCost {
                today: parse_cost(r.gemini_cost_day.as_ref()),
                this_month: parse_cost(r.gemini_cost_month.as_ref()),
                total: parse_cost(r.gemini_cost_total.as_ref()),
            },
            last_updated: r.last_updated,
        }
    }
}

impl From<AppUserRecord> for UserSummary {
    fn from(r: AppUserRecord) -> Self {
        Self {
            id: r.auth_user_id.or(r.user_id),
            email: r.email.unwrap_or_default(),
            name: non_blank(r.name),
            role: Role::from_stored(r.role.as_deref()).unwrap_or(Role::User),
            status: r.status,
            subscription_expiry: r.subscription_expiry,
            created_at: r.created_at,
        }
    }
}

// ── History ────────────────────────────────────────────────────────

impl From<PlannerRunRecord> for HistoryEntry {
    fn from(r: PlannerRunRecord) -> Self {
        let window = match (r.start_time.as_deref(), r.end_time.as_deref()) {
            (Some(start), Some(end)) => format!(" ({start}-{end})"),
            _ => String::new(),
        };
        Self {
            tool: ToolKind::Planner,
            created_at: r.created_at,
            summary: format!("{}{window}", r.requested_routine),
            result: r.result,
        }
    }
}

impl From<EmotionLogRecord> for HistoryEntry {
    fn from(r: EmotionLogRecord) -> Self {
        Self {
            tool: ToolKind::Emotion,
            created_at: r.created_at,
            summary: r.mood,
            result: Value::String(r.result),
        }
    }
}

/// Meal-plan and recipe runs share a row shape; the summary comes from
/// the stored request.
pub(crate) fn json_run_entry(tool: ToolKind, r: JsonRunRecord) -> HistoryEntry {
    let summary = match tool {
        ToolKind::Recipe => r.prompt.get("dishName").and_then(Value::as_str).map(str::to_owned),
        _ => r.prompt.get("childName").and_then(Value::as_str).map(|child| {
            let months = r.prompt.get("childAge").and_then(Value::as_u64).unwrap_or(0);
            format!("meal plan for {child}, {months} months")
        }),
    };
    HistoryEntry {
        tool,
        created_at: r.created_at,
        summary: summary.unwrap_or_else(|| tool.to_string()),
        result: r.result,
    }
}
