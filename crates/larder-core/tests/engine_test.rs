//! End-to-end generation against the in-memory catalog and store.
//!
//! Covers the full pipeline (validate, pool, allocate, summarize, suggest,
//! persist) and its failure paths without a database.

use std::collections::HashSet;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use larder_db::models::{Difficulty, MealType, Recipe};
use larder_db::queries::recipes::RecipeFilter;

use larder_core::catalog::{MemoryCatalog, RecipeCatalog};
use larder_core::plan::{GeneratedPlan, MAX_SERVINGS, MIN_SERVINGS, generate_plan, load_plan};
use larder_core::store::{MemoryPlanStore, PersistedPlan, PlanStore};
use larder_core::{PlanError, PlanRequest};

// ===========================================================================
// Fixtures
// ===========================================================================

fn recipe(id: i64, calories: f64, protein_g: f64) -> Recipe {
    Recipe {
        id,
        name: format!("recipe {id}"),
        dietary_tags: Vec::new(),
        cuisine: "italian".to_string(),
        difficulty: Difficulty::Easy,
        prep_time_minutes: 15,
        cook_time_minutes: 20,
        servings: 1,
        calories,
        protein_g,
        carbs_g: 60.0,
        fat_g: 20.0,
        fiber_g: 6.0,
        sugar_g: 8.0,
        sodium_mg: 500.0,
        created_at: Utc::now(),
    }
}

fn tagged(id: i64, tags: &[&str], cuisine: &str) -> Recipe {
    Recipe {
        dietary_tags: tags.iter().map(|t| t.to_string()).collect(),
        cuisine: cuisine.to_string(),
        ..recipe(id, 600.0, 30.0)
    }
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x1a2de5)
}

struct DownCatalog;

#[async_trait]
impl RecipeCatalog for DownCatalog {
    async fn find_recipes(&self, _filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        Err(anyhow!("catalog offline"))
    }

    async fn recipes_by_ids(&self, _ids: &[i64]) -> Result<Vec<Recipe>> {
        Err(anyhow!("catalog offline"))
    }
}

struct DownStore;

#[async_trait]
impl PlanStore for DownStore {
    async fn persist(&self, _plan: &GeneratedPlan) -> Result<Uuid> {
        Err(anyhow!("disk full"))
    }

    async fn fetch(&self, _plan_id: Uuid) -> Result<Option<PersistedPlan>> {
        Err(anyhow!("disk full"))
    }
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[tokio::test]
async fn oversized_single_recipe_floors_every_serving() {
    let catalog = MemoryCatalog::new(vec![recipe(1, 2000.0, 40.0)]);
    let store = MemoryPlanStore::new();
    let request = PlanRequest::new(2000.0, start(), 1);

    let outcome = generate_plan(&catalog, &store, &request, &mut rng())
        .await
        .unwrap();

    let meals = &outcome.plan.meals;
    assert_eq!(meals.len(), 3);
    assert!(meals.iter().all(|m| m.recipe_id == 1));
    assert!(meals.iter().all(|m| m.servings == 0.5));
    let types: Vec<MealType> = meals.iter().map(|m| m.meal_type).collect();
    assert_eq!(types, MealType::SCHEDULED.to_vec());
}

#[tokio::test]
async fn low_protein_plan_is_flagged() {
    // Breakfast can only be recipe 1 (1.25 servings of 24 g) and lunch and
    // dinner only recipe 2 (1 serving of 30 g): 90 g protein a day, below
    // 0.8 × 150 g.
    let catalog = MemoryCatalog::new(vec![recipe(1, 400.0, 24.0), recipe(2, 700.0, 30.0)]);
    let store = MemoryPlanStore::new();
    let mut request = PlanRequest::new(2000.0, start(), 2);
    request.target_protein_g = Some(150.0);

    let outcome = generate_plan(&catalog, &store, &request, &mut rng())
        .await
        .unwrap();

    assert_eq!(outcome.summary.avg_protein_g, 90);
    assert!(
        outcome.suggestions.iter().any(|s| s.contains("protein-rich")),
        "suggestions: {:?}",
        outcome.suggestions
    );
}

#[tokio::test]
async fn unmatched_restriction_fails_with_no_eligible_recipes() {
    let catalog = MemoryCatalog::new(vec![tagged(1, &["vegan"], "thai")]);
    let store = MemoryPlanStore::new();
    let mut request = PlanRequest::new(2000.0, start(), 3);
    request.dietary_restrictions = vec!["carnivore".into()];

    let err = generate_plan(&catalog, &store, &request, &mut rng())
        .await
        .unwrap_err();

    assert!(matches!(err, PlanError::NoEligibleRecipes));
    assert!(store.is_empty(), "nothing may be persisted on failure");
}

#[tokio::test]
async fn repeated_recipe_scores_low_variety() {
    let catalog = MemoryCatalog::new(vec![recipe(1, 600.0, 40.0)]);
    let store = MemoryPlanStore::new();
    let request = PlanRequest::new(2000.0, start(), 2);

    let outcome = generate_plan(&catalog, &store, &request, &mut rng())
        .await
        .unwrap();

    assert_eq!(outcome.plan.meals.len(), 6);
    assert_eq!(outcome.summary.variety_score, 17);
    assert!(
        outcome
            .suggestions
            .iter()
            .any(|s| s.contains("exploring more recipes"))
    );
}

#[tokio::test]
async fn long_single_recipe_plan_still_asks_for_variety() {
    // 210 slots over one recipe rounds the score down to zero.
    let catalog = MemoryCatalog::new(vec![recipe(1, 600.0, 40.0)]);
    let store = MemoryPlanStore::new();
    let request = PlanRequest::new(2000.0, start(), 70);

    let outcome = generate_plan(&catalog, &store, &request, &mut rng())
        .await
        .unwrap();

    assert_eq!(outcome.plan.meals.len(), 210);
    assert_eq!(outcome.summary.variety_score, 0);
    assert!(
        outcome
            .suggestions
            .iter()
            .any(|s| s.contains("exploring more recipes")),
        "got {:?}",
        outcome.suggestions
    );
}

// ===========================================================================
// Properties
// ===========================================================================

#[tokio::test]
async fn every_slot_respects_serving_bounds_and_grid() {
    let pool: Vec<Recipe> = (1..=25)
        .map(|id| recipe(id, 50.0 * id as f64, 10.0 + id as f64))
        .collect();
    let catalog = MemoryCatalog::new(pool);
    let store = MemoryPlanStore::new();

    for (seed, calories) in [(1_u64, 1200.0), (2, 2000.0), (3, 3400.0), (4, 800.0)] {
        let request = PlanRequest::new(calories, start(), 14);
        let outcome = generate_plan(&catalog, &store, &request, &mut StdRng::seed_from_u64(seed))
            .await
            .unwrap();

        let meals = &outcome.plan.meals;
        assert_eq!(meals.len(), 42);
        assert!(
            meals
                .iter()
                .all(|m| (MIN_SERVINGS..=MAX_SERVINGS).contains(&m.servings))
        );
        let keys: HashSet<_> = meals.iter().map(|m| (m.date, m.meal_type)).collect();
        assert_eq!(keys.len(), 42);
        assert!(outcome.summary.variety_score <= 100);
    }
}

#[tokio::test]
async fn same_seed_reproduces_the_plan() {
    let pool: Vec<Recipe> = (1..=12).map(|id| recipe(id, 400.0 + 25.0 * id as f64, 30.0)).collect();
    let catalog = MemoryCatalog::new(pool);
    let store = MemoryPlanStore::new();
    let request = PlanRequest::new(2200.0, start(), 7);

    let a = generate_plan(&catalog, &store, &request, &mut StdRng::seed_from_u64(9))
        .await
        .unwrap();
    let b = generate_plan(&catalog, &store, &request, &mut StdRng::seed_from_u64(9))
        .await
        .unwrap();

    assert_ne!(a.plan_id, b.plan_id);
    assert_eq!(a.plan.meals, b.plan.meals);
    assert_eq!(a.summary, b.summary);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn suggestions_always_end_with_reminders() {
    let catalog = MemoryCatalog::new(vec![recipe(1, 500.0, 30.0), recipe(2, 700.0, 30.0)]);
    let store = MemoryPlanStore::new();
    let outcome = generate_plan(&catalog, &store, &PlanRequest::new(2000.0, start(), 1), &mut rng())
        .await
        .unwrap();

    let n = outcome.suggestions.len();
    assert!(n >= 2);
    assert!(outcome.suggestions[n - 2].contains("water"));
    assert!(outcome.suggestions[n - 1].contains("Batch-prepare"));
}

#[tokio::test]
async fn filters_restrict_the_pool() {
    let catalog = MemoryCatalog::new(vec![
        tagged(1, &["vegan"], "thai"),
        tagged(2, &["vegetarian"], "Italian"),
        tagged(3, &["vegan"], "italian"),
        tagged(4, &[], "mexican"),
    ]);
    let store = MemoryPlanStore::new();
    let mut request = PlanRequest::new(2000.0, start(), 5);
    request.dietary_restrictions = vec!["Vegan".into(), "vegetarian".into()];
    request.cuisines = vec![" ITALIAN ".into()];

    let outcome = generate_plan(&catalog, &store, &request, &mut rng())
        .await
        .unwrap();

    let used: HashSet<i64> = outcome.plan.meals.iter().map(|m| m.recipe_id).collect();
    assert!(used.is_subset(&HashSet::from([2, 3])), "used {used:?}");
    assert_eq!(outcome.plan.request.cuisines, vec!["italian".to_string()]);
}

// ===========================================================================
// Failure paths
// ===========================================================================

#[tokio::test]
async fn invalid_request_is_rejected_before_any_io() {
    let store = MemoryPlanStore::new();
    let request = PlanRequest::new(0.0, start(), 1);

    let err = generate_plan(&DownCatalog, &store, &request, &mut rng())
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::InvalidRequest(_)));

    let zero_days = PlanRequest::new(2000.0, start(), 0);
    let err = generate_plan(&DownCatalog, &store, &zero_days, &mut rng())
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::InvalidRequest(_)));
}

#[tokio::test]
async fn unreachable_catalog_is_catalog_unavailable() {
    let store = MemoryPlanStore::new();
    let err = generate_plan(&DownCatalog, &store, &PlanRequest::new(2000.0, start(), 1), &mut rng())
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::CatalogUnavailable(_)));
}

#[tokio::test]
async fn failed_persist_is_not_success() {
    let catalog = MemoryCatalog::new(vec![recipe(1, 600.0, 30.0)]);
    let err = generate_plan(&catalog, &DownStore, &PlanRequest::new(2000.0, start(), 1), &mut rng())
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::PersistenceFailure(_)));
}

// ===========================================================================
// Read-back
// ===========================================================================

#[tokio::test]
async fn unreadable_store_is_store_unavailable() {
    let catalog = MemoryCatalog::new(vec![recipe(1, 600.0, 30.0)]);
    let err = load_plan(&catalog, &DownStore, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::StoreUnavailable(_)));
}

#[tokio::test]
async fn load_plan_matches_generated_plan() {
    let catalog = MemoryCatalog::new(
        (1..=6)
            .map(|id| recipe(id, 450.0 + 50.0 * id as f64, 35.0))
            .collect(),
    );
    let store = MemoryPlanStore::new();
    let request = PlanRequest::new(2100.0, start(), 4);

    let outcome = generate_plan(&catalog, &store, &request, &mut rng())
        .await
        .unwrap();
    let loaded = load_plan(&catalog, &store, outcome.plan_id).await.unwrap();

    assert_eq!(loaded.plan_id, outcome.plan_id);
    assert_eq!(loaded.plan.meals, outcome.plan.meals);
    assert_eq!(loaded.plan.start_date, outcome.plan.start_date);
    assert_eq!(loaded.plan.end_date, outcome.plan.end_date);
    assert_eq!(loaded.summary, outcome.summary);
}

#[tokio::test]
async fn load_unknown_plan_is_not_found() {
    let catalog = MemoryCatalog::new(Vec::new());
    let store = MemoryPlanStore::new();
    let id = Uuid::new_v4();

    let err = load_plan(&catalog, &store, id).await.unwrap_err();
    assert!(matches!(err, PlanError::PlanNotFound(found) if found == id));
}

#[tokio::test]
async fn load_keeps_slots_whose_recipe_is_gone() {
    let full = MemoryCatalog::new(vec![recipe(1, 500.0, 30.0)]);
    let store = MemoryPlanStore::new();
    let outcome = generate_plan(&full, &store, &PlanRequest::new(2000.0, start(), 1), &mut rng())
        .await
        .unwrap();

    let emptied = MemoryCatalog::new(Vec::new());
    let loaded = load_plan(&emptied, &store, outcome.plan_id).await.unwrap();

    assert_eq!(loaded.plan.meals.len(), 3);
    assert!(loaded.plan.recipes.is_empty());
    assert_eq!(loaded.summary.avg_calories, 0);
}
