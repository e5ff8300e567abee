// ── Admin and subscription types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Role;

/// Run counts for one tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub today: u64,
    pub this_month: u64,
    pub total: u64,
}

/// Accumulated AI spend in US dollars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiCost {
    pub today: f64,
    pub this_month: f64,
    pub total: f64,
}

/// Dashboard-wide usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub registered_users: u64,
    pub active_users: u64,
    pub expired_users: u64,
    pub renewed_users: u64,
    pub expiring_soon: u64,
    pub admin_users: u64,
    pub total_logs: u64,
    pub planner: ToolUsage,
    pub meal: ToolUsage,
    pub emotion: ToolUsage,
    pub ai_cost: AiCost,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One row of the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Option<String>,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub status: Option<String>,
    pub subscription_expiry: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of an administrator-issued account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub subscription_expiry: DateTime<Utc>,
}

/// A user's subscription, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub is_active: bool,
    pub remaining_days: Option<i64>,
    pub expiry: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub renewal_needed: bool,
}

impl SubscriptionStatus {
    /// Treated as active when the backend reports nothing.
    pub fn unknown() -> Self {
        Self {
            is_active: true,
            remaining_days: None,
            expiry: None,
            status: None,
            renewal_needed: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        !self.is_active
    }
}
