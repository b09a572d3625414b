//! Plan service layer.
//!
//! [`generate_plan`] runs the whole pipeline against a catalog and a store:
//! validate, build the candidate pool, allocate slots, summarize, suggest,
//! persist. It either returns a persisted plan with its summary and
//! feedback, or one [`PlanError`]; nothing is retried and nothing partial is
//! reported. [`load_plan`] reads a stored plan back into the same shape.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::allocate::allocate;
use super::candidates::build_candidate_pool;
use super::nutrition::{NutritionSummary, summarize};
use super::suggest::suggest;
use super::GeneratedPlan;
use crate::catalog::RecipeCatalog;
use crate::error::PlanError;
use crate::request::PlanRequest;
use crate::store::PlanStore;

/// A successfully generated and persisted plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub plan_id: Uuid,
    pub plan: GeneratedPlan,
    pub summary: NutritionSummary,
    pub suggestions: Vec<String>,
}

/// A stored plan read back and rejoined with its recipes.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedPlan {
    pub plan_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plan: GeneratedPlan,
    pub summary: NutritionSummary,
}

/// Generate a plan for `request` and persist it.
///
/// `rng` drives every random draw; a seeded generator reproduces the same
/// slots for the same request and catalog contents.
pub async fn generate_plan<R>(
    catalog: &dyn RecipeCatalog,
    store: &dyn PlanStore,
    request: &PlanRequest,
    rng: &mut R,
) -> Result<PlanOutcome, PlanError>
where
    R: Rng + ?Sized,
{
    let request = request.validated()?;

    let pool = build_candidate_pool(catalog, &request).await?;
    if pool.is_empty() {
        info!(
            dietary = ?request.dietary_restrictions,
            cuisines = ?request.cuisines,
            "no recipes match request"
        );
        return Err(PlanError::NoEligibleRecipes);
    }

    let meals = allocate(&request, &pool, rng)?;
    let plan = GeneratedPlan::new(request, meals, &pool);
    let summary = summarize(&plan);
    let suggestions = suggest(&summary, &plan.request);

    let plan_id = store.persist(&plan).await.map_err(PlanError::persistence)?;

    info!(
        %plan_id,
        start = %plan.start_date,
        days = plan.request.day_count,
        meals = plan.meals.len(),
        candidates = pool.len(),
        variety = summary.variety_score,
        "generated meal plan"
    );

    Ok(PlanOutcome {
        plan_id,
        plan,
        summary,
        suggestions,
    })
}

/// Read a stored plan back, joining its slots against the catalog.
///
/// Slots whose recipe has since left the catalog are kept; they contribute
/// no nutrition to the summary.
pub async fn load_plan(
    catalog: &dyn RecipeCatalog,
    store: &dyn PlanStore,
    plan_id: Uuid,
) -> Result<LoadedPlan, PlanError> {
    let stored = store
        .fetch(plan_id)
        .await
        .map_err(PlanError::store)?
        .ok_or(PlanError::PlanNotFound(plan_id))?;

    let ids: Vec<i64> = stored
        .meals
        .iter()
        .map(|m| m.recipe_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let recipes = catalog
        .recipes_by_ids(&ids)
        .await
        .map_err(PlanError::catalog)?;

    if recipes.len() < ids.len() {
        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !recipes.iter().any(|r| r.id == *id))
            .collect();
        warn!(%plan_id, ?missing, "plan references recipes missing from catalog");
    }

    let plan = GeneratedPlan::new(stored.request, stored.meals, &recipes);
    let summary = summarize(&plan);

    Ok(LoadedPlan {
        plan_id: stored.plan_id,
        created_at: stored.created_at,
        plan,
        summary,
    })
}
