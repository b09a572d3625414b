//! Database query functions for the `recipes` table (the recipe catalog).

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};

use crate::models::{Difficulty, Recipe};

/// Structural filters for a catalog query.
///
/// Every field is optional and the categories combine with AND. Within a
/// multi-valued category (dietary tags, cuisines) a recipe matches if it
/// satisfies any listed value. An empty list means "no filter", the same as
/// `None`. Tag and cuisine comparisons are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub dietary_tags: Option<Vec<String>>,
    pub cuisines: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
    pub max_prep_time_minutes: Option<i32>,
}

impl RecipeFilter {
    /// True when no filter would constrain the query.
    pub fn is_unfiltered(&self) -> bool {
        non_empty_lowercase(self.dietary_tags.as_deref()).is_none()
            && non_empty_lowercase(self.cuisines.as_deref()).is_none()
            && self.difficulty.is_none()
            && self.max_prep_time_minutes.is_none()
    }
}

/// Lower-case a filter list, mapping an empty list to `None`.
fn non_empty_lowercase(values: Option<&[String]>) -> Option<Vec<String>> {
    values
        .filter(|v| !v.is_empty())
        .map(|v| v.iter().map(|s| s.to_lowercase()).collect())
}

/// Parameters for inserting a new recipe row.
#[derive(Debug, Clone)]
pub struct NewRecipe<'a> {
    pub name: &'a str,
    pub dietary_tags: &'a [String],
    pub cuisine: &'a str,
    pub difficulty: Difficulty,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub servings: i32,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
}

/// Insert a new recipe. Returns the inserted row with server-generated
/// defaults (id, created_at).
pub async fn insert_recipe<'e, E>(executor: E, new: &NewRecipe<'_>) -> Result<Recipe>
where
    E: PgExecutor<'e>,
{
    let recipe = sqlx::query_as::<_, Recipe>(
        "INSERT INTO recipes (name, dietary_tags, cuisine, difficulty, prep_time_minutes, \
         cook_time_minutes, servings, calories, protein_g, carbs_g, fat_g, fiber_g, \
         sugar_g, sodium_mg) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.dietary_tags)
    .bind(new.cuisine)
    .bind(new.difficulty)
    .bind(new.prep_time_minutes)
    .bind(new.cook_time_minutes)
    .bind(new.servings)
    .bind(new.calories)
    .bind(new.protein_g)
    .bind(new.carbs_g)
    .bind(new.fat_g)
    .bind(new.fiber_g)
    .bind(new.sugar_g)
    .bind(new.sodium_mg)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert recipe {:?}", new.name))?;

    Ok(recipe)
}

/// Fetch a recipe by its ID.
pub async fn get_recipe(pool: &PgPool, id: i64) -> Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch recipe")?;

    Ok(recipe)
}

/// Fetch every recipe whose ID is in `ids`. Unknown IDs are skipped.
pub async fn get_recipes_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Recipe>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let recipes =
        sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(pool)
            .await
            .context("failed to fetch recipes by id")?;

    Ok(recipes)
}

/// Query the catalog with structural filters. See [`RecipeFilter`].
pub async fn find_recipes(pool: &PgPool, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
    let recipes = sqlx::query_as::<_, Recipe>(
        "SELECT * FROM recipes \
         WHERE ($1::text[] IS NULL \
                OR EXISTS (SELECT 1 FROM unnest(dietary_tags) tag WHERE lower(tag) = ANY($1))) \
           AND ($2::text[] IS NULL OR lower(cuisine) = ANY($2)) \
           AND ($3::text IS NULL OR difficulty = $3) \
           AND ($4::integer IS NULL OR prep_time_minutes <= $4) \
         ORDER BY id",
    )
    .bind(non_empty_lowercase(filter.dietary_tags.as_deref()))
    .bind(non_empty_lowercase(filter.cuisines.as_deref()))
    .bind(filter.difficulty)
    .bind(filter.max_prep_time_minutes)
    .fetch_all(pool)
    .await
    .context("failed to query recipe catalog")?;

    Ok(recipes)
}

/// Count all recipes in the catalog.
pub async fn count_recipes(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await
        .context("failed to count recipes")?;

    Ok(count)
}
