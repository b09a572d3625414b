//! CLI handlers for `larder recipe` subcommands.
//!
//! Implements:
//! - `larder recipe import <file>` -- load recipes from a TOML file
//! - `larder recipe count`         -- print the catalog size
//!
//! Import file format:
//!
//! ```toml
//! [[recipes]]
//! name = "Chickpea curry"
//! dietary_tags = ["vegan", "gluten-free"]
//! cuisine = "indian"
//! difficulty = "easy"
//! prep_time_minutes = 15
//! cook_time_minutes = 30
//! servings = 4
//!
//! [recipes.nutrition]
//! calories = 520.0
//! protein_g = 21.0
//! carbs_g = 68.0
//! fat_g = 16.0
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use sqlx::PgPool;

use larder_db::models::{Difficulty, Recipe};
use larder_db::queries::recipes::{self as recipe_queries, NewRecipe};

use crate::RecipeCommands;

// -----------------------------------------------------------------------
// File format
// -----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RecipeFile {
    #[serde(default)]
    pub recipes: Vec<RecipeToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeToml {
    pub name: String,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    pub cuisine: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prep_time_minutes: i32,
    #[serde(default)]
    pub cook_time_minutes: i32,
    #[serde(default = "default_servings")]
    pub servings: i32,
    pub nutrition: NutritionToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NutritionToml {
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
    #[serde(default)]
    pub sugar_g: f64,
    #[serde(default)]
    pub sodium_mg: f64,
}

fn default_difficulty() -> Difficulty {
    Difficulty::Easy
}

fn default_servings() -> i32 {
    1
}

/// Parse and validate an import file. Tags are lower-cased and
/// de-duplicated.
pub fn parse_recipe_file(content: &str) -> Result<Vec<RecipeToml>> {
    let file: RecipeFile = toml::from_str(content).context("failed to parse recipe TOML")?;
    if file.recipes.is_empty() {
        bail!("recipe file contains no [[recipes]] entries");
    }

    let mut recipes = file.recipes;
    for (i, recipe) in recipes.iter_mut().enumerate() {
        validate(recipe).with_context(|| format!("recipe #{} ({:?})", i + 1, recipe.name))?;

        let mut tags: Vec<String> = Vec::with_capacity(recipe.dietary_tags.len());
        for tag in &recipe.dietary_tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        recipe.dietary_tags = tags;
        recipe.cuisine = recipe.cuisine.trim().to_string();
    }

    Ok(recipes)
}

fn validate(recipe: &RecipeToml) -> Result<()> {
    if recipe.name.trim().is_empty() {
        bail!("name must not be empty");
    }
    if recipe.cuisine.trim().is_empty() {
        bail!("cuisine must not be empty");
    }
    if recipe.servings < 1 {
        bail!("servings must be at least 1, got {}", recipe.servings);
    }
    if recipe.prep_time_minutes < 0 || recipe.cook_time_minutes < 0 {
        bail!("prep and cook times must not be negative");
    }

    let n = &recipe.nutrition;
    for (field, value) in [
        ("calories", n.calories),
        ("protein_g", n.protein_g),
        ("carbs_g", n.carbs_g),
        ("fat_g", n.fat_g),
        ("fiber_g", n.fiber_g),
        ("sugar_g", n.sugar_g),
        ("sodium_mg", n.sodium_mg),
    ] {
        if !value.is_finite() || value < 0.0 {
            bail!("nutrition.{field} must be a non-negative number, got {value}");
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `RecipeCommands` variant to the appropriate handler.
pub async fn run_recipe_command(command: RecipeCommands, pool: &PgPool) -> Result<()> {
    match command {
        RecipeCommands::Import { file } => cmd_import(pool, &file).await,
        RecipeCommands::Count => cmd_count(pool).await,
    }
}

async fn cmd_import(pool: &PgPool, file_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read recipe file: {file_path}"))?;
    let recipes = parse_recipe_file(&content)
        .with_context(|| format!("invalid recipe file: {file_path}"))?;

    let inserted = import_recipes(pool, &recipes).await?;

    println!("Imported {} recipes.", inserted.len());
    for recipe in &inserted {
        println!("  {:>6}  {}", recipe.id, recipe.name);
    }
    Ok(())
}

/// Insert every recipe in one transaction; either all land or none do.
pub async fn import_recipes(pool: &PgPool, recipes: &[RecipeToml]) -> Result<Vec<Recipe>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let mut inserted = Vec::with_capacity(recipes.len());
    for r in recipes {
        let new = NewRecipe {
            name: r.name.trim(),
            dietary_tags: &r.dietary_tags,
            cuisine: &r.cuisine,
            difficulty: r.difficulty,
            prep_time_minutes: r.prep_time_minutes,
            cook_time_minutes: r.cook_time_minutes,
            servings: r.servings,
            calories: r.nutrition.calories,
            protein_g: r.nutrition.protein_g,
            carbs_g: r.nutrition.carbs_g,
            fat_g: r.nutrition.fat_g,
            fiber_g: r.nutrition.fiber_g,
            sugar_g: r.nutrition.sugar_g,
            sodium_mg: r.nutrition.sodium_mg,
        };
        inserted.push(recipe_queries::insert_recipe(&mut *tx, &new).await?);
    }

    tx.commit().await.context("failed to commit transaction")?;
    tracing::info!(count = inserted.len(), "imported recipes");
    Ok(inserted)
}

async fn cmd_count(pool: &PgPool) -> Result<()> {
    let count = recipe_queries::count_recipes(pool).await?;
    println!("{count} recipes in catalog.");
    Ok(())
}
