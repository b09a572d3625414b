//! The recipe catalog as seen by the engine.
//!
//! The engine only reads the catalog. [`PgRecipeCatalog`] is the production
//! adapter; [`MemoryCatalog`] applies the same filter semantics to a fixed
//! list of recipes.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use larder_db::models::Recipe;
use larder_db::queries::recipes::{self as recipe_queries, RecipeFilter};

/// Read-only access to recipe records.
///
/// No ordering is promised by [`RecipeCatalog::find_recipes`]; callers must
/// not depend on it.
#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    /// All recipes matching `filter`. An unfiltered query returns the whole
    /// catalog.
    async fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>>;

    /// The recipes with the given ids. Unknown ids are skipped.
    async fn recipes_by_ids(&self, ids: &[i64]) -> Result<Vec<Recipe>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn RecipeCatalog) {}
};

/// Catalog backed by the `recipes` table.
#[derive(Debug, Clone)]
pub struct PgRecipeCatalog {
    pool: PgPool,
}

impl PgRecipeCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeCatalog for PgRecipeCatalog {
    async fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        recipe_queries::find_recipes(&self.pool, filter).await
    }

    async fn recipes_by_ids(&self, ids: &[i64]) -> Result<Vec<Recipe>> {
        recipe_queries::get_recipes_by_ids(&self.pool, ids).await
    }
}

/// Catalog over an in-memory recipe list.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    recipes: Vec<Recipe>,
}

impl MemoryCatalog {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }
}

#[async_trait]
impl RecipeCatalog for MemoryCatalog {
    async fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        Ok(self
            .recipes
            .iter()
            .filter(|r| matches_filter(r, filter))
            .cloned()
            .collect())
    }

    async fn recipes_by_ids(&self, ids: &[i64]) -> Result<Vec<Recipe>> {
        Ok(self
            .recipes
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }
}

/// Whether `recipe` passes every category of `filter`.
///
/// Mirrors the SQL in [`recipe_queries::find_recipes`].
pub fn matches_filter(recipe: &Recipe, filter: &RecipeFilter) -> bool {
    let tags_ok = match filter.dietary_tags.as_deref() {
        Some(wanted) if !wanted.is_empty() => recipe
            .dietary_tags
            .iter()
            .any(|tag| wanted.iter().any(|w| w.eq_ignore_ascii_case(tag))),
        _ => true,
    };
    let cuisine_ok = match filter.cuisines.as_deref() {
        Some(wanted) if !wanted.is_empty() => {
            wanted.iter().any(|c| c.eq_ignore_ascii_case(&recipe.cuisine))
        }
        _ => true,
    };
    let difficulty_ok = filter.difficulty.is_none_or(|d| d == recipe.difficulty);
    let prep_ok = filter
        .max_prep_time_minutes
        .is_none_or(|max| recipe.prep_time_minutes <= max);

    tags_ok && cuisine_ok && difficulty_ok && prep_ok
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;

    use larder_db::models::Difficulty;

    use super::*;

    pub(crate) fn recipe(id: i64, calories: f64) -> Recipe {
        Recipe {
            id,
            name: format!("recipe-{id}"),
            dietary_tags: Vec::new(),
            cuisine: "any".to_string(),
            difficulty: Difficulty::Easy,
            prep_time_minutes: 10,
            cook_time_minutes: 20,
            servings: 1,
            calories,
            protein_g: 20.0,
            carbs_g: 50.0,
            fat_g: 15.0,
            fiber_g: 4.0,
            sugar_g: 5.0,
            sodium_mg: 300.0,
            created_at: Utc::now(),
        }
    }

    fn tagged(id: i64, tags: &[&str], cuisine: &str, prep: i32, difficulty: Difficulty) -> Recipe {
        Recipe {
            dietary_tags: tags.iter().map(|t| t.to_string()).collect(),
            cuisine: cuisine.to_string(),
            prep_time_minutes: prep,
            difficulty,
            ..recipe(id, 500.0)
        }
    }

    #[test]
    fn unfiltered_matches_everything() {
        let r = tagged(1, &[], "thai", 90, Difficulty::Hard);
        assert!(matches_filter(&r, &RecipeFilter::default()));
    }

    #[test]
    fn tags_are_or_within_category() {
        let r = tagged(1, &["Vegan"], "thai", 10, Difficulty::Easy);
        let filter = RecipeFilter {
            dietary_tags: Some(vec!["keto".into(), "vegan".into()]),
            ..Default::default()
        };
        assert!(matches_filter(&r, &filter));

        let miss = RecipeFilter {
            dietary_tags: Some(vec!["keto".into()]),
            ..Default::default()
        };
        assert!(!matches_filter(&r, &miss));
    }

    #[test]
    fn categories_are_and_across() {
        let r = tagged(1, &["vegan"], "Thai", 10, Difficulty::Easy);
        let both = RecipeFilter {
            dietary_tags: Some(vec!["vegan".into()]),
            cuisines: Some(vec!["thai".into()]),
            difficulty: Some(Difficulty::Easy),
            max_prep_time_minutes: Some(10),
        };
        assert!(matches_filter(&r, &both));

        let wrong_difficulty = RecipeFilter {
            difficulty: Some(Difficulty::Medium),
            ..both.clone()
        };
        assert!(!matches_filter(&r, &wrong_difficulty));

        let too_slow = RecipeFilter {
            max_prep_time_minutes: Some(9),
            ..both
        };
        assert!(!matches_filter(&r, &too_slow));
    }

    #[tokio::test]
    async fn memory_catalog_filters_and_looks_up_by_id() {
        let catalog = MemoryCatalog::new(vec![
            tagged(1, &["vegan"], "thai", 10, Difficulty::Easy),
            tagged(2, &[], "italian", 10, Difficulty::Easy),
        ]);
        let filter = RecipeFilter {
            cuisines: Some(vec!["italian".into()]),
            ..Default::default()
        };
        let found = catalog.find_recipes(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);

        let by_id = catalog.recipes_by_ids(&[1, 99]).await.unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, 1);
    }
}
