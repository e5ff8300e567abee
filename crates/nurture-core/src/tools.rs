// ── AI tool service ──
//
// The planner, meal, recipe and emotion assistants. Each call builds a
// prompt, asks the completion service for schema-constrained output,
// records the run, and hands the typed result back. Only sessions the
// router sends to a dashboard may use the tools.

use std::sync::Arc;

use async_trait::async_trait;
use nurture_api::{Completion, GenerativeClient, TokenUsage};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{
    DailyPlan, EmotionCheckIn, HistoryEntry, Identity, MealPlan, MealPlanRequest, PlannerRequest,
    Recipe, RecipeRequest, ToolKind, UserId,
};
use crate::router::{Screen, route};
use crate::session::SessionState;

/// History listing size when the caller does not pick one.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

// ── Seams ────────────────────────────────────────────────────────

/// Generates model output. Implemented by [`GenerativeClient`].
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// JSON output constrained by `schema`.
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Completion<Value>, CoreError>;

    async fn complete_text(&self, prompt: &str) -> Result<Completion<String>, CoreError>;
}

#[async_trait]
impl CompletionService for GenerativeClient {
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Completion<Value>, CoreError> {
        Ok(self.generate_json(prompt, schema).await?)
    }

    async fn complete_text(&self, prompt: &str) -> Result<Completion<String>, CoreError> {
        Ok(self.generate_text(prompt).await?)
    }
}

/// One finished tool run, ready to persist.
#[derive(Debug, Clone)]
pub enum ToolRun {
    Planner {
        request: PlannerRequest,
        prompt: String,
        plan: Value,
    },
    MealPlan {
        request: MealPlanRequest,
        plan: Value,
    },
    Recipe {
        request: RecipeRequest,
        recipe: Value,
    },
    Emotion {
        check_in: EmotionCheckIn,
        prompt: String,
        reply: String,
    },
}

impl ToolRun {
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Planner { .. } => ToolKind::Planner,
            Self::MealPlan { .. } => ToolKind::MealPlan,
            Self::Recipe { .. } => ToolKind::Recipe,
            Self::Emotion { .. } => ToolKind::Emotion,
        }
    }
}

/// Where tool runs are kept.
#[async_trait]
pub trait ToolStore: Send + Sync {
    async fn record_run(&self, user: &UserId, run: &ToolRun) -> Result<(), CoreError>;

    /// Most recent runs of `tool`, newest first.
    async fn history(
        &self,
        user: &UserId,
        tool: ToolKind,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, CoreError>;
}

// ── ToolService ──────────────────────────────────────────────────

pub struct ToolService {
    completion: Arc<dyn CompletionService>,
    store: Arc<dyn ToolStore>,
}

impl ToolService {
    pub fn new(completion: Arc<dyn CompletionService>, store: Arc<dyn ToolStore>) -> Self {
        Self { completion, store }
    }

    pub async fn daily_plan(
        &self,
        session: &SessionState,
        request: &PlannerRequest,
    ) -> Result<DailyPlan, CoreError> {
        let identity = require_dashboard(session)?;
        let prompt = planner_prompt(request);
        let completion = self.completion.complete(&prompt, &planner_schema()).await?;
        log_usage(ToolKind::Planner, completion.usage.as_ref());

        let plan: DailyPlan = parse_output(&completion.output)?;
        self.record(
            identity,
            ToolRun::Planner {
                request: request.clone(),
                prompt,
                plan: completion.output,
            },
        )
        .await;
        Ok(plan)
    }

    pub async fn meal_plan(
        &self,
        session: &SessionState,
        request: &MealPlanRequest,
    ) -> Result<MealPlan, CoreError> {
        let identity = require_dashboard(session)?;
        let prompt = meal_plan_prompt(request);
        let completion = self.completion.complete(&prompt, &meal_plan_schema()).await?;
        log_usage(ToolKind::MealPlan, completion.usage.as_ref());

        let plan: MealPlan = parse_output(&completion.output)?;
        self.record(
            identity,
            ToolRun::MealPlan {
                request: request.clone(),
                plan: completion.output,
            },
        )
        .await;
        Ok(plan)
    }

    pub async fn recipe(
        &self,
        session: &SessionState,
        request: &RecipeRequest,
    ) -> Result<Recipe, CoreError> {
        let identity = require_dashboard(session)?;
        if request.dish_name.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "dish name is required".into(),
            });
        }
        let prompt = recipe_prompt(request);
        let completion = self.completion.complete(&prompt, &recipe_schema()).await?;
        log_usage(ToolKind::Recipe, completion.usage.as_ref());

        let recipe: Recipe = parse_output(&completion.output)?;
        self.record(
            identity,
            ToolRun::Recipe {
                request: request.clone(),
                recipe: completion.output,
            },
        )
        .await;
        Ok(recipe)
    }

    /// A short supportive message in reply to a mood check-in.
    pub async fn emotion_support(
        &self,
        session: &SessionState,
        check_in: &EmotionCheckIn,
    ) -> Result<String, CoreError> {
        let identity = require_dashboard(session)?;
        let prompt = emotion_prompt(check_in);
        let completion = self.completion.complete_text(&prompt).await?;
        log_usage(ToolKind::Emotion, completion.usage.as_ref());

        let reply = completion.output;
        self.record(
            identity,
            ToolRun::Emotion {
                check_in: check_in.clone(),
                prompt,
                reply: reply.clone(),
            },
        )
        .await;
        Ok(reply)
    }

    pub async fn history(
        &self,
        session: &SessionState,
        tool: ToolKind,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, CoreError> {
        let identity = require_dashboard(session)?;
        self.store.history(&identity.id, tool, limit.max(1)).await
    }

    /// A failed write never costs the user the output they asked for.
    async fn record(&self, identity: &Identity, run: ToolRun) {
        let kind = run.kind();
        match self.store.record_run(&identity.id, &run).await {
            Ok(()) => debug!(tool = %kind, user = %identity.id, "tool run recorded"),
            Err(e) => warn!(tool = %kind, error = %e, "could not record tool run"),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn require_dashboard(session: &SessionState) -> Result<&Identity, CoreError> {
    match route(session) {
        Screen::UserDashboard | Screen::AdminDashboard => {
            session.identity().ok_or(CoreError::NotSignedIn)
        }
        Screen::ProfileSetup => Err(CoreError::SetupIncomplete),
        Screen::Loading => Err(CoreError::ResolverNotRunning),
        Screen::Login | Screen::PasswordReset => Err(CoreError::NotSignedIn),
    }
}

fn parse_output<T: DeserializeOwned>(output: &Value) -> Result<T, CoreError> {
    serde_json::from_value(output.clone()).map_err(|e| CoreError::Ai {
        message: format!("response did not match the expected shape: {e}"),
    })
}

fn log_usage(tool: ToolKind, usage: Option<&TokenUsage>) {
    if let Some(u) = usage {
        debug!(
            %tool,
            prompt_tokens = u.prompt_token_count,
            output_tokens = u.candidates_token_count,
            total_tokens = u.total_token_count,
            "completion usage"
        );
    }
}

// ── Prompts ──────────────────────────────────────────────────────

fn planner_prompt(r: &PlannerRequest) -> String {
    let window = match (r.start_time.as_deref(), r.end_time.as_deref()) {
        (Some(start), Some(end)) => format!(" Time: between {start} and {end}."),
        _ => String::new(),
    };
    let notes = r
        .notes
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!(" Notes: {n}."))
        .unwrap_or_default();
    format!(
        "Daily parenting plan for {} ({} years). Parent: {}. Focus: {}.{window}{notes} \
         Language: {}. Need structured plan with parenting tip.",
        r.child_name, r.child_age, r.parent_name, r.focus_areas, r.language
    )
}

fn meal_plan_prompt(r: &MealPlanRequest) -> String {
    let mother = r
        .mother_age
        .map(|age| format!(" and mother (age {age})"))
        .unwrap_or_default();
    let diet = if r.dietary_preferences.is_empty() {
        "None".to_owned()
    } else {
        r.dietary_preferences.join(", ")
    };
    let extra = r
        .additional_instructions
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!(" Additional instructions: {s}."))
        .unwrap_or_default();
    format!(
        "1-day meal plan for {} ({} months old){mother}. Dietary: {diet}.{extra} \
         Include baby & mother meals for breakfast/lunch/dinner/snack with ingredients \
         and shopping_list. Language: {}.",
        r.child_name, r.child_age, r.language
    )
}

fn recipe_prompt(r: &RecipeRequest) -> String {
    format!(
        "Create a comprehensive, detailed recipe for \"{dish}\" that is family-friendly and \
         suitable for parents with children.\n\n\
         REQUIREMENTS:\n\
         - Write in {lang} language\n\
         - Include a detailed description of the dish\n\
         - Provide a complete ingredient list with exact measurements\n\
         - Give step-by-step cooking instructions with detailed explanations\n\
         - Include cooking tips and expert advice\n\
         - Add nutritional benefits or interesting facts\n\
         - Suggest variations or customizations\n\
         - Provide cooking times and temperatures\n\n\
         The recipe should be detailed enough that a beginner cook can follow it.",
        dish = r.dish_name.trim(),
        lang = r.language
    )
}

fn emotion_prompt(c: &EmotionCheckIn) -> String {
    let name = c.user_name.as_deref().filter(|n| !n.trim().is_empty());
    let context = c
        .note
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!(" Context: \"{n}\"."))
        .unwrap_or_default();
    let address = name
        .map(|n| format!(" using their name \"{n}\""))
        .unwrap_or_default();
    let opening = name.map(|n| format!("{n}, ")).unwrap_or_default();
    format!(
        "Write a direct, supportive message to a parent feeling \"{}\".{context} \
         Address them directly{address}, not as instructions to deliver a message. \
         Include: 1) personal validation of their feelings, 2) direct encouraging words \
         (max 150 words), 3) actionable advice they can try. Write in {}. \
         Start with \"{opening}\" and speak directly to them as their supportive parenting coach.",
        c.mood, c.language
    )
}

// ── Response schemas ─────────────────────────────────────────────

fn planner_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "daily_plan": {
                "type": "ARRAY",
                "description": "A list of timed activities for the day.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "time": {"type": "STRING", "description": "Time of day (e.g., 8:00 AM)"},
                        "activity": {"type": "STRING", "description": "Name of the activity"},
                        "details": {"type": "STRING", "description": "Brief details about the activity"}
                    },
                    "required": ["time", "activity", "details"]
                }
            },
            "parenting_tip": {"type": "STRING", "description": "A single, helpful parenting tip."}
        },
        "required": ["daily_plan", "parenting_tip"]
    })
}

fn dish_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": {"type": "STRING"},
            "ingredients": {"type": "ARRAY", "items": {"type": "STRING"}},
            "recipe": {"type": "STRING"}
        },
        "required": ["name", "ingredients"]
    })
}

fn meal_plan_schema() -> Value {
    let meal = json!({
        "type": "OBJECT",
        "properties": {"baby": dish_schema(), "mother": dish_schema()},
        "required": ["baby", "mother"]
    });
    json!({
        "type": "OBJECT",
        "properties": {
            "breakfast": meal,
            "lunch": meal,
            "dinner": meal,
            "snack": meal,
            "shopping_list": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["breakfast", "lunch", "dinner", "snack", "shopping_list"]
    })
}

fn recipe_schema() -> Value {
    let text = |description: &str| json!({"type": "STRING", "description": description});
    let list = |description: &str| {
        json!({"type": "ARRAY", "items": {"type": "STRING"}, "description": description})
    };
    json!({
        "type": "OBJECT",
        "properties": {
            "dish_name": {"type": "STRING"},
            "description": text("Detailed introduction about the dish"),
            "prep_time": text("Preparation time"),
            "cook_time": text("Cooking time"),
            "total_time": text("Total time needed"),
            "servings": text("Number of servings"),
            "difficulty": text("Difficulty level (Easy/Medium/Hard)"),
            "ingredients": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "item": text("Ingredient name with quantity"),
                        "notes": text("Optional notes about the ingredient")
                    },
                    "required": ["item"]
                }
            },
            "instructions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "step": {"type": "NUMBER", "description": "Step number"},
                        "title": text("Brief title for the step"),
                        "instruction": text("Detailed instruction"),
                        "tip": text("Optional cooking tip for this step")
                    },
                    "required": ["step", "instruction"]
                }
            },
            "expert_tips": list("Professional cooking tips"),
            "variations": list("Recipe variations or customizations"),
            "nutritional_info": text("Nutritional benefits or interesting facts"),
            "storage_tips": text("How to store leftovers"),
            "shopping_list": list("Organized shopping list")
        },
        "required": ["dish_name", "description", "ingredients", "instructions", "shopping_list"]
    })
}
