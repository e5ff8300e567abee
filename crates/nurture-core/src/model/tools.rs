// ── AI tool inputs, outputs and history ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The three assistants, with the meal assistant's two modes split out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ToolKind {
    Planner,
    MealPlan,
    Recipe,
    Emotion,
}

impl ToolKind {
    /// Table each run is persisted to.
    pub fn table(self) -> &'static str {
        match self {
            Self::Planner => "planner_runs",
            Self::MealPlan => "meal_plan_runs",
            Self::Recipe => "single_recipe_runs",
            Self::Emotion => "emotion_logs",
        }
    }
}

// ── Planner ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerRequest {
    pub parent_name: String,
    pub child_name: String,
    /// Child's age in whole years.
    pub child_age: u32,
    /// Activity areas to focus on (e.g. "motor skills, reading").
    pub focus_areas: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Free-text extra instructions.
    pub notes: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub time: String,
    pub activity: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub daily_plan: Vec<PlanItem>,
    pub parenting_tip: String,
}

// ── Meal plan ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRequest {
    pub child_name: String,
    /// Child's age in months.
    pub child_age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_age: Option<u32>,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub baby: Dish,
    pub mother: Dish,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlan {
    pub breakfast: Meal,
    pub lunch: Meal,
    pub dinner: Meal,
    pub snack: Meal,
    #[serde(default)]
    pub shopping_list: Vec<String>,
}

// ── Single recipe ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    pub dish_name: String,
    pub language: String,
}

/// Older runs stored plain strings; newer ones carry structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ingredient {
    Detailed {
        item: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instruction {
    Detailed {
        step: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        instruction: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tip: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub dish_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub expert_tips: Vec<String>,
    #[serde(default)]
    pub variations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutritional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_tips: Option<String>,
    #[serde(default)]
    pub shopping_list: Vec<String>,
}

// ── Emotion check-in ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionCheckIn {
    pub mood: String,
    pub note: Option<String>,
    /// Name the reply addresses the parent by.
    pub user_name: Option<String>,
    pub language: String,
}

// ── History ─────────────────────────────────────────────────────────

/// One persisted tool run, newest first when listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub tool: ToolKind,
    pub created_at: Option<DateTime<Utc>>,
    /// One-line description of what was asked.
    pub summary: String,
    /// The stored output, as persisted.
    pub result: serde_json::Value,
}
