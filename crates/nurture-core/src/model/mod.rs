// ── Domain model ──
//
// Canonical types consumers (the CLI) depend on. Backend record shapes
// never leak past the adapter in `convert`.

pub mod admin;
pub mod identity;
pub mod profile;
pub mod tools;

// ── Re-exports ──────────────────────────────────────────────────────

pub use admin::{AiCost, CreatedUser, SubscriptionStatus, ToolUsage, UsageStats, UserSummary};
pub use identity::{Identity, PersistedIdentity, Role, SetupStatus, UserId};
pub use profile::{Address, ChildDetails, FamilyProfile, Profile, SpouseDetails};
pub use tools::{
    DailyPlan, Dish, EmotionCheckIn, HistoryEntry, Ingredient, Instruction, Meal, MealPlan,
    MealPlanRequest, PlanItem, PlannerRequest, Recipe, RecipeRequest, ToolKind,
};
