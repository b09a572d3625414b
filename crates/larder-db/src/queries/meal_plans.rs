//! Database query functions for the `meal_plans` and `planned_meals` tables.
//!
//! The insert functions take any executor so callers can run the plan header
//! and its slots inside one transaction.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Difficulty, MealPlan, MealType, PlannedMeal};

/// Parameters for inserting a plan header.
#[derive(Debug, Clone)]
pub struct NewMealPlan<'a> {
    pub target_calories: f64,
    pub target_protein_g: Option<f64>,
    pub target_carbs_g: Option<f64>,
    pub target_fat_g: Option<f64>,
    pub dietary_restrictions: &'a [String],
    pub cuisines: &'a [String],
    pub difficulty: Option<Difficulty>,
    pub max_prep_time_minutes: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_count: i32,
}

/// Parameters for one slot row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPlannedMeal {
    pub meal_date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: i64,
    pub servings: f64,
}

/// Insert a plan header. Returns the row with its generated id.
pub async fn insert_meal_plan<'e, E>(executor: E, new: &NewMealPlan<'_>) -> Result<MealPlan>
where
    E: PgExecutor<'e>,
{
    let plan = sqlx::query_as::<_, MealPlan>(
        "INSERT INTO meal_plans (target_calories, target_protein_g, target_carbs_g, \
         target_fat_g, dietary_restrictions, cuisines, difficulty, max_prep_time_minutes, \
         start_date, end_date, day_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(new.target_calories)
    .bind(new.target_protein_g)
    .bind(new.target_carbs_g)
    .bind(new.target_fat_g)
    .bind(new.dietary_restrictions)
    .bind(new.cuisines)
    .bind(new.difficulty)
    .bind(new.max_prep_time_minutes)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(new.day_count)
    .fetch_one(executor)
    .await
    .context("failed to insert meal plan")?;

    Ok(plan)
}

/// Insert all slots of a plan in a single statement.
///
/// Returns the number of rows written.
pub async fn insert_planned_meals<'e, E>(
    executor: E,
    plan_id: Uuid,
    meals: &[NewPlannedMeal],
) -> Result<u64>
where
    E: PgExecutor<'e>,
{
    if meals.is_empty() {
        return Ok(0);
    }

    let dates: Vec<NaiveDate> = meals.iter().map(|m| m.meal_date).collect();
    let meal_types: Vec<String> = meals.iter().map(|m| m.meal_type.to_string()).collect();
    let recipe_ids: Vec<i64> = meals.iter().map(|m| m.recipe_id).collect();
    let servings: Vec<f64> = meals.iter().map(|m| m.servings).collect();

    let result = sqlx::query(
        "INSERT INTO planned_meals (plan_id, meal_date, meal_type, recipe_id, servings) \
         SELECT $1, d, t, r, s \
         FROM UNNEST($2::date[], $3::text[], $4::bigint[], $5::float8[]) AS slot(d, t, r, s)",
    )
    .bind(plan_id)
    .bind(&dates)
    .bind(&meal_types)
    .bind(&recipe_ids)
    .bind(&servings)
    .execute(executor)
    .await
    .with_context(|| format!("failed to insert planned meals for plan {plan_id}"))?;

    Ok(result.rows_affected())
}

/// Fetch a plan header by its ID.
pub async fn get_meal_plan(pool: &PgPool, id: Uuid) -> Result<Option<MealPlan>> {
    let plan = sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch meal plan")?;

    Ok(plan)
}

/// List all plan headers, newest first.
pub async fn list_meal_plans(pool: &PgPool) -> Result<Vec<MealPlan>> {
    let plans = sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .context("failed to list meal plans")?;

    Ok(plans)
}

/// List a plan's slots ordered by date, then breakfast, lunch, dinner, snack.
pub async fn list_planned_meals(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlannedMeal>> {
    let meals = sqlx::query_as::<_, PlannedMeal>(
        "SELECT * FROM planned_meals WHERE plan_id = $1 \
         ORDER BY meal_date, \
                  CASE meal_type \
                      WHEN 'breakfast' THEN 0 \
                      WHEN 'lunch' THEN 1 \
                      WHEN 'dinner' THEN 2 \
                      ELSE 3 \
                  END",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list planned meals")?;

    Ok(meals)
}

/// Count the slots of each plan in one round trip.
pub async fn count_planned_meals(pool: &PgPool) -> Result<Vec<(Uuid, i64)>> {
    let rows: Vec<(Uuid, i64)> =
        sqlx::query_as("SELECT plan_id, COUNT(*) FROM planned_meals GROUP BY plan_id")
            .fetch_all(pool)
            .await
            .context("failed to count planned meals")?;

    Ok(rows)
}

/// Delete a plan and, through the cascade, its slots.
pub async fn delete_meal_plan(pool: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM meal_plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete meal plan")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("meal plan {id} not found");
    }

    Ok(())
}
