// Backend wire types
//
// Raw record shapes as the hosted backend returns them. Field names match
// the table columns; nearly everything is optional because rows created
// by different provisioning paths fill different columns. `nurture-core`
// normalizes these into canonical domain types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

// ── Auth ─────────────────────────────────────────────────────────────

/// The user object embedded in auth responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// `user_metadata.full_name`, when the signup flow recorded one.
    pub fn metadata_full_name(&self) -> Option<&str> {
        self.user_metadata.get("full_name").and_then(|v| v.as_str())
    }
}

#[derive(Deserialize)]
pub(crate) struct RawAuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// A successful password sign-in.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

impl From<RawAuthSession> for AuthSession {
    fn from(raw: RawAuthSession) -> Self {
        Self {
            access_token: SecretString::from(raw.access_token),
            refresh_token: raw.refresh_token.map(SecretString::from),
            expires_in: raw.expires_in,
            user: raw.user,
        }
    }
}

// ── Profile tables ───────────────────────────────────────────────────

/// Row of the `app_users` table (account + role + subscription).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppUserRecord {
    #[serde(default)]
    pub auth_user_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub subscription_renewed: Option<bool>,
    #[serde(default)]
    pub subscription_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row of the `user_profiles` table (family details).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Result row of the `get_user_subscription_status` RPC.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionStatusRecord {
    #[serde(default)]
    pub subscription_remaining_days: Option<i64>,
    #[serde(default)]
    pub subscription_expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub renewal_needed: Option<bool>,
}

// ── Tool runs ────────────────────────────────────────────────────────

/// Row of `planner_runs`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlannerRunRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub user_id: String,
    pub requested_routine: String,
    pub parenting_tip_of_the_day: String,
    pub prompt: String,
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row of `meal_plan_runs` and `single_recipe_runs` (same shape: JSON
/// prompt + JSON result).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JsonRunRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub user_id: String,
    pub prompt: serde_json::Value,
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row of `emotion_logs`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EmotionLogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub user_id: String,
    pub mood: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ── Admin ────────────────────────────────────────────────────────────

/// Row of the `admin_dashboard_stats` view.
///
/// Cost columns are `numeric` in the database and arrive either as JSON
/// numbers or strings depending on the driver, hence `serde_json::Value`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[allow(clippy::struct_field_names)]
pub struct AdminStatsRecord {
    #[serde(default)]
    pub registered_users: Option<u64>,
    #[serde(default)]
    pub active_users: Option<u64>,
    #[serde(default)]
    pub expired_users: Option<u64>,
    #[serde(default)]
    pub renewed_users: Option<u64>,
    #[serde(default)]
    pub expiring_soon: Option<u64>,
    #[serde(default)]
    pub total_logs: Option<u64>,
    #[serde(default)]
    pub admin_users: Option<u64>,
    #[serde(default)]
    pub planner_total: Option<u64>,
    #[serde(default)]
    pub planner_day: Option<u64>,
    #[serde(default)]
    pub planner_month: Option<u64>,
    #[serde(default)]
    pub meal_total: Option<u64>,
    #[serde(default)]
    pub meal_day: Option<u64>,
    #[serde(default)]
    pub meal_month: Option<u64>,
    #[serde(default)]
    pub emotion_total: Option<u64>,
    #[serde(default)]
    pub emotion_day: Option<u64>,
    #[serde(default)]
    pub emotion_month: Option<u64>,
    #[serde(default)]
    pub gemini_cost_total: Option<serde_json::Value>,
    #[serde(default)]
    pub gemini_cost_month: Option<serde_json::Value>,
    #[serde(default)]
    pub gemini_cost_day: Option<serde_json::Value>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}
