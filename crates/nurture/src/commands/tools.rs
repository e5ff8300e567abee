//! AI tool handlers: daily planner, meals, emotion check-in, history.

use serde::Serialize;
use tabled::Tabled;

use nurture_core::model::{Dish, Ingredient, Instruction, Meal};
use nurture_core::{
    DailyPlan, EmotionCheckIn, HistoryEntry, MealPlan, MealPlanRequest, PlannerRequest, Recipe,
    RecipeRequest, Screen, ToolKind, ToolStore, route,
};

use crate::cli::{CheckinArgs, GlobalOpts, HistoryArgs, MealArgs, MealCommand, PlanArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Activity")]
    activity: String,
    #[tabled(rename = "Details")]
    details: String,
}

#[derive(Tabled)]
struct MealRow {
    #[tabled(rename = "Meal")]
    meal: &'static str,
    #[tabled(rename = "Baby")]
    baby: String,
    #[tabled(rename = "Mother")]
    mother: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Tool")]
    tool: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(e: &HistoryEntry) -> Self {
        Self {
            date: e
                .created_at
                .map_or_else(|| "-".into(), |d| d.format("%Y-%m-%d %H:%M").to_string()),
            tool: e.tool.to_string(),
            summary: e.summary.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckinReply<'a> {
    mood: &'a str,
    reply: &'a str,
}

// ── Renderers ───────────────────────────────────────────────────────

fn plan_detail(plan: &DailyPlan) -> String {
    let rows: Vec<PlanRow> = plan
        .daily_plan
        .iter()
        .map(|item| PlanRow {
            time: item.time.clone(),
            activity: item.activity.clone(),
            details: item.details.clone(),
        })
        .collect();
    format!(
        "{}\n\nTip: {}",
        output::render_table(&rows),
        plan.parenting_tip
    )
}

fn dish_cell(dish: &Dish) -> String {
    if dish.ingredients.is_empty() {
        dish.name.clone()
    } else {
        format!("{}\n({})", dish.name, dish.ingredients.join(", "))
    }
}

fn meal_detail(plan: &MealPlan) -> String {
    let meals: [(&'static str, &Meal); 4] = [
        ("Breakfast", &plan.breakfast),
        ("Lunch", &plan.lunch),
        ("Dinner", &plan.dinner),
        ("Snack", &plan.snack),
    ];
    let rows: Vec<MealRow> = meals
        .iter()
        .map(|&(label, meal)| MealRow {
            meal: label,
            baby: dish_cell(&meal.baby),
            mother: dish_cell(&meal.mother),
        })
        .collect();

    let mut out = output::render_table(&rows);
    if !plan.shopping_list.is_empty() {
        out.push_str("\n\nShopping list:\n");
        out.push_str(&bullets(&plan.shopping_list));
    }
    out
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn recipe_detail(recipe: &Recipe) -> String {
    let mut out = recipe.dish_name.clone();
    if let Some(desc) = &recipe.description {
        out.push_str(&format!("\n{desc}"));
    }

    let facts: Vec<(&str, String)> = [
        ("Prep", &recipe.prep_time),
        ("Cook", &recipe.cook_time),
        ("Total", &recipe.total_time),
        ("Serves", &recipe.servings),
        ("Difficulty", &recipe.difficulty),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.as_ref().map(|v| (k, v.clone())))
    .collect();
    if !facts.is_empty() {
        out.push_str("\n\n");
        out.push_str(&output::detail_lines(&facts));
    }

    if !recipe.ingredients.is_empty() {
        out.push_str("\n\nIngredients:\n");
        let lines: Vec<String> = recipe
            .ingredients
            .iter()
            .map(|i| match i {
                Ingredient::Detailed {
                    item,
                    notes: Some(notes),
                } => format!("{item} ({notes})"),
                Ingredient::Detailed { item, notes: None } | Ingredient::Plain(item) => {
                    item.clone()
                }
            })
            .collect();
        out.push_str(&bullets(&lines));
    }

    if !recipe.instructions.is_empty() {
        out.push_str("\n\nSteps:");
        for (n, step) in recipe.instructions.iter().enumerate() {
            let line = match step {
                Instruction::Detailed {
                    title,
                    instruction,
                    tip,
                    ..
                } => {
                    let mut line = match title {
                        Some(t) => format!("{t}: {instruction}"),
                        None => instruction.clone(),
                    };
                    if let Some(tip) = tip {
                        line.push_str(&format!(" (tip: {tip})"));
                    }
                    line
                }
                Instruction::Plain(text) => text.clone(),
            };
            out.push_str(&format!("\n  {}. {line}", n + 1));
        }
    }

    for (heading, list) in [
        ("Expert tips", &recipe.expert_tips),
        ("Variations", &recipe.variations),
        ("Shopping list", &recipe.shopping_list),
    ] {
        if !list.is_empty() {
            out.push_str(&format!("\n\n{heading}:\n{}", bullets(list)));
        }
    }
    if let Some(info) = &recipe.nutritional_info {
        out.push_str(&format!("\n\nNutrition: {info}"));
    }
    if let Some(storage) = &recipe.storage_tips {
        out.push_str(&format!("\nStorage: {storage}"));
    }
    out
}

/// Name the planner addresses the parent by when none is given.
fn parent_name(ctx: &Context, given: Option<String>) -> String {
    given.unwrap_or_else(|| {
        ctx.snapshot()
            .identity()
            .map(|i| i.email_local_part().to_owned())
            .unwrap_or_else(|| "Parent".into())
    })
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn plan(ctx: &Context, args: PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tools = ctx.tools()?;
    ctx.require_active_subscription().await?;

    let request = PlannerRequest {
        parent_name: parent_name(ctx, args.parent),
        child_name: args.child,
        child_age: args.age,
        focus_areas: args.focus,
        start_time: args.start,
        end_time: args.end,
        notes: args.notes,
        language: args.language,
    };

    let spinner = util::spinner("Planning the day...", global.quiet);
    let result = tools.daily_plan(&ctx.snapshot(), &request).await;
    spinner.finish_and_clear();
    let plan = result?;

    let out = output::render_single(&global.output, &plan, plan_detail, |p| {
        p.daily_plan
            .iter()
            .map(|i| format!("{}\t{}", i.time, i.activity))
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn meal(ctx: &Context, args: MealArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tools = ctx.tools()?;
    ctx.require_active_subscription().await?;

    match args.command {
        MealCommand::Plan {
            child,
            months,
            mother_age,
            diets,
            instructions,
            language,
        } => {
            let request = MealPlanRequest {
                child_name: child,
                child_age: months,
                mother_age,
                dietary_preferences: diets,
                additional_instructions: instructions,
                language,
            };
            let spinner = util::spinner("Planning meals...", global.quiet);
            let result = tools.meal_plan(&ctx.snapshot(), &request).await;
            spinner.finish_and_clear();
            let plan = result?;

            let out = output::render_single(&global.output, &plan, meal_detail, |p| {
                p.shopping_list.join("\n")
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MealCommand::Recipe { dish, language } => {
            let request = RecipeRequest {
                dish_name: dish,
                language,
            };
            let spinner = util::spinner("Writing the recipe...", global.quiet);
            let result = tools.recipe(&ctx.snapshot(), &request).await;
            spinner.finish_and_clear();
            let recipe = result?;

            let out = output::render_single(&global.output, &recipe, recipe_detail, |r| {
                r.dish_name.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

pub async fn checkin(ctx: &Context, args: CheckinArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tools = ctx.tools()?;
    ctx.require_active_subscription().await?;

    let state = ctx.snapshot();
    let check_in = EmotionCheckIn {
        mood: args.mood,
        note: args.note,
        user_name: state.identity().map(|i| i.email_local_part().to_owned()),
        language: args.language,
    };

    let spinner = util::spinner("Listening...", global.quiet);
    let result = tools.emotion_support(&state, &check_in).await;
    spinner.finish_and_clear();
    let reply = result?;

    let view = CheckinReply {
        mood: &check_in.mood,
        reply: &reply,
    };
    let out = output::render_single(&global.output, &view, |v| v.reply.to_owned(), |v| {
        v.reply.to_owned()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn history(ctx: &Context, args: &HistoryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let state = ctx.snapshot();
    let identity = match route(&state) {
        Screen::UserDashboard | Screen::AdminDashboard => {
            state.identity().ok_or(CliError::NotSignedIn)?
        }
        Screen::ProfileSetup => return Err(CliError::SetupRequired),
        Screen::Login | Screen::PasswordReset | Screen::Loading => {
            return Err(CliError::NotSignedIn);
        }
    };
    let kind = ToolKind::from(args.tool);
    let entries = ctx
        .backend
        .history(&identity.id, kind, args.limit.max(1))
        .await?;

    if entries.is_empty() && matches!(global.output, crate::cli::OutputFormat::Table) {
        output::print_status(&format!("No {kind} runs yet"), global.quiet);
        return Ok(());
    }
    let out = output::render_list(&global.output, &entries, |e| HistoryRow::from(e), |e| {
        e.summary.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
