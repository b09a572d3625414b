//! CLI handlers for `larder plan` subcommands.
//!
//! Implements:
//! - `larder plan generate --calories N [...]` -- generate and persist a plan
//! - `larder plan show <plan-id>`              -- read a stored plan back
//! - `larder plan list`                        -- list stored plans
//! - `larder plan delete <plan-id>`            -- delete a plan and its slots

use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use larder_core::PlanRequest;
use larder_core::catalog::PgRecipeCatalog;
use larder_core::plan::{GeneratedPlan, NutritionSummary, generate_plan, load_plan, suggest};
use larder_core::store::PgPlanStore;
use larder_db::models::Difficulty;
use larder_db::queries::meal_plans as plan_queries;

use crate::PlanCommands;

/// Flags for `larder plan generate`.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Daily calorie target
    #[arg(long)]
    pub calories: f64,
    /// Daily protein target in grams
    #[arg(long)]
    pub protein: Option<f64>,
    /// Daily carbohydrate target in grams
    #[arg(long)]
    pub carbs: Option<f64>,
    /// Daily fat target in grams
    #[arg(long)]
    pub fat: Option<f64>,
    /// Dietary tag; a recipe matches if it has any of them (repeatable or comma-separated)
    #[arg(long = "diet", value_delimiter = ',')]
    pub diets: Vec<String>,
    /// Cuisine; a recipe matches if it is any of them (repeatable or comma-separated)
    #[arg(long = "cuisine", value_delimiter = ',')]
    pub cuisines: Vec<String>,
    /// Required difficulty: easy, medium or hard
    #[arg(long)]
    pub difficulty: Option<Difficulty>,
    /// Maximum prep time in minutes
    #[arg(long)]
    pub max_prep: Option<i32>,
    /// First planned day (YYYY-MM-DD, default today)
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Number of days to plan
    #[arg(long, default_value_t = 7)]
    pub days: u32,
    /// Seed for recipe selection (overrides LARDER_SEED and the config file)
    #[arg(long)]
    pub seed: Option<u64>,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    fn to_request(&self, today: NaiveDate) -> PlanRequest {
        PlanRequest {
            target_calories: self.calories,
            target_protein_g: self.protein,
            target_carbs_g: self.carbs,
            target_fat_g: self.fat,
            dietary_restrictions: self.diets.clone(),
            cuisines: self.cuisines.clone(),
            difficulty: self.difficulty,
            max_prep_time_minutes: self.max_prep,
            start_date: self.start.unwrap_or(today),
            day_count: self.days,
        }
    }
}

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
///
/// `configured_seed` is the seed resolved from env or config file, if any.
pub async fn run_plan_command(
    command: PlanCommands,
    pool: &PgPool,
    configured_seed: Option<u64>,
) -> Result<()> {
    match command {
        PlanCommands::Generate(args) => cmd_generate(pool, &args, configured_seed).await,
        PlanCommands::Show { plan_id, json } => cmd_show(pool, &plan_id, json).await,
        PlanCommands::List => cmd_list(pool).await,
        PlanCommands::Delete { plan_id } => cmd_delete(pool, &plan_id).await,
    }
}

/// Build the generator for one plan. Without a pinned seed a fresh one is
/// drawn so that it can still be reported and replayed.
pub fn plan_rng(seed: Option<u64>) -> (StdRng, u64) {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    (StdRng::seed_from_u64(seed), seed)
}

// -----------------------------------------------------------------------
// larder plan generate
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateOutput<'a> {
    plan_id: Uuid,
    seed: u64,
    plan: &'a GeneratedPlan,
    summary: &'a NutritionSummary,
    suggestions: &'a [String],
}

async fn cmd_generate(
    pool: &PgPool,
    args: &GenerateArgs,
    configured_seed: Option<u64>,
) -> Result<()> {
    let request = args.to_request(Local::now().date_naive());
    let (mut rng, seed) = plan_rng(args.seed.or(configured_seed));
    info!(seed, "generating meal plan");

    let catalog = PgRecipeCatalog::new(pool.clone());
    let store = PgPlanStore::new(pool.clone());
    let outcome = generate_plan(&catalog, &store, &request, &mut rng).await?;

    if args.json {
        let out = GenerateOutput {
            plan_id: outcome.plan_id,
            seed,
            plan: &outcome.plan,
            summary: &outcome.summary,
            suggestions: &outcome.suggestions,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Meal plan created.");
    println!();
    println!("  Plan ID: {}", outcome.plan_id);
    println!("  Seed:    {seed}");
    println!();
    print!(
        "{}",
        render_plan(&outcome.plan, &outcome.summary, &outcome.suggestions)
    );
    Ok(())
}

// -----------------------------------------------------------------------
// larder plan show <plan-id>
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct ShowOutput<'a> {
    plan_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    plan: &'a GeneratedPlan,
    summary: &'a NutritionSummary,
    suggestions: &'a [String],
}

async fn cmd_show(pool: &PgPool, plan_id_str: &str, json: bool) -> Result<()> {
    let plan_id = parse_plan_id(plan_id_str)?;

    let catalog = PgRecipeCatalog::new(pool.clone());
    let store = PgPlanStore::new(pool.clone());
    let loaded = load_plan(&catalog, &store, plan_id).await?;
    let suggestions = suggest(&loaded.summary, &loaded.plan.request);

    if json {
        let out = ShowOutput {
            plan_id: loaded.plan_id,
            created_at: loaded.created_at,
            plan: &loaded.plan,
            summary: &loaded.summary,
            suggestions: &suggestions,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Plan:    {}", loaded.plan_id);
    println!("Created: {}", loaded.created_at.format("%Y-%m-%d %H:%M"));
    println!();
    print!("{}", render_plan(&loaded.plan, &loaded.summary, &suggestions));
    Ok(())
}

// -----------------------------------------------------------------------
// larder plan list
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let plans = plan_queries::list_meal_plans(pool).await?;

    if plans.is_empty() {
        println!("No meal plans found. Use `larder plan generate --calories N` to create one.");
        return Ok(());
    }

    let meal_counts: HashMap<Uuid, i64> = plan_queries::count_planned_meals(pool)
        .await?
        .into_iter()
        .collect();

    let id_w = 36;
    println!(
        "{:<id_w$}  {:<10}  {:<10}  {:>5}  {:>6}  {:>8}  CREATED",
        "ID", "START", "END", "DAYS", "MEALS", "KCAL",
    );
    for plan in &plans {
        let meals = meal_counts.get(&plan.id).copied().unwrap_or(0);
        println!(
            "{:<id_w$}  {:<10}  {:<10}  {:>5}  {:>6}  {:>8.0}  {}",
            plan.id,
            plan.start_date,
            plan.end_date,
            plan.day_count,
            meals,
            plan.target_calories,
            plan.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// larder plan delete <plan-id>
// -----------------------------------------------------------------------

async fn cmd_delete(pool: &PgPool, plan_id_str: &str) -> Result<()> {
    let plan_id = parse_plan_id(plan_id_str)?;
    plan_queries::delete_meal_plan(pool, plan_id).await?;
    println!("Deleted meal plan {plan_id}.");
    Ok(())
}

// -----------------------------------------------------------------------
// Formatting
// -----------------------------------------------------------------------

fn parse_plan_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("invalid plan ID: {raw}"))
}

/// Render a plan as a per-day table followed by averages and suggestions.
pub fn render_plan(
    plan: &GeneratedPlan,
    summary: &NutritionSummary,
    suggestions: &[String],
) -> String {
    let mut out = String::new();

    let name_w = plan
        .recipes
        .values()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(6)
        .max(6);

    let _ = writeln!(
        out,
        "{} to {} ({} days)",
        plan.start_date, plan.end_date, plan.request.day_count
    );

    for (date, slots) in plan.meals_by_date() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", date.format("%a %Y-%m-%d"));
        for slot in slots {
            let (name, kcal) = match plan.recipe_for(slot) {
                Some(r) => (r.name.as_str(), r.calories * slot.servings),
                None => ("(missing recipe)", 0.0),
            };
            let _ = writeln!(
                out,
                "  {:<9}  {:<name_w$}  x{:<4.2}  {:>6.0} kcal",
                slot.meal_type.to_string(),
                name,
                slot.servings,
                kcal,
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Daily averages");
    let _ = writeln!(out, "  Calories: {} kcal", summary.avg_calories);
    let _ = writeln!(out, "  Protein:  {} g", summary.avg_protein_g);
    let _ = writeln!(out, "  Carbs:    {} g", summary.avg_carbs_g);
    let _ = writeln!(out, "  Fat:      {} g", summary.avg_fat_g);
    let _ = writeln!(out, "  Variety:  {}/100", summary.variety_score);

    if !suggestions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Suggestions");
        for s in suggestions {
            let _ = writeln!(out, "  - {s}");
        }
    }

    out
}
