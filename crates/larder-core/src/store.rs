//! Durable storage for generated plans.
//!
//! A plan is written as a header plus its slots. [`PlanStore::persist`]
//! writes both as one unit: a reader never sees a header without its slots.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use larder_db::models::{MealPlan, PlannedMeal};
use larder_db::queries::meal_plans::{self as plan_queries, NewMealPlan, NewPlannedMeal};

use crate::plan::{GeneratedPlan, MealSlot};
use crate::request::PlanRequest;

/// A plan as it was stored: its echoed request and its slots, ordered by
/// date and then breakfast, lunch, dinner, snack.
#[derive(Debug, Clone, Serialize)]
pub struct PersistedPlan {
    pub plan_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub request: PlanRequest,
    pub meals: Vec<MealSlot>,
}

/// Write-once storage for generated plans.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Store the plan header and every slot atomically. Returns the plan id.
    async fn persist(&self, plan: &GeneratedPlan) -> Result<Uuid>;

    /// Read a stored plan back, or `None` if no plan has this id.
    async fn fetch(&self, plan_id: Uuid) -> Result<Option<PersistedPlan>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// Store backed by the `meal_plans` and `planned_meals` tables.
#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn persist(&self, plan: &GeneratedPlan) -> Result<Uuid> {
        let request = &plan.request;
        let day_count = i32::try_from(request.day_count).context("day count out of range")?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        let header = plan_queries::insert_meal_plan(
            &mut *tx,
            &NewMealPlan {
                target_calories: request.target_calories,
                target_protein_g: request.target_protein_g,
                target_carbs_g: request.target_carbs_g,
                target_fat_g: request.target_fat_g,
                dietary_restrictions: &request.dietary_restrictions,
                cuisines: &request.cuisines,
                difficulty: request.difficulty,
                max_prep_time_minutes: request.max_prep_time_minutes,
                start_date: plan.start_date,
                end_date: plan.end_date,
                day_count,
            },
        )
        .await?;

        let slots: Vec<NewPlannedMeal> = plan
            .meals
            .iter()
            .map(|m| NewPlannedMeal {
                meal_date: m.date,
                meal_type: m.meal_type,
                recipe_id: m.recipe_id,
                servings: m.servings,
            })
            .collect();

        let written = plan_queries::insert_planned_meals(&mut *tx, header.id, &slots).await?;
        if written != slots.len() as u64 {
            // Dropping the transaction rolls back the header too.
            bail!(
                "wrote {written} of {} slots for plan {}",
                slots.len(),
                header.id
            );
        }

        tx.commit().await.context("failed to commit transaction")?;

        Ok(header.id)
    }

    async fn fetch(&self, plan_id: Uuid) -> Result<Option<PersistedPlan>> {
        let Some(header) = plan_queries::get_meal_plan(&self.pool, plan_id).await? else {
            return Ok(None);
        };
        let rows = plan_queries::list_planned_meals(&self.pool, plan_id).await?;

        Ok(Some(PersistedPlan {
            plan_id: header.id,
            created_at: header.created_at,
            request: request_from_header(&header)?,
            meals: rows.iter().map(slot_from_row).collect(),
        }))
    }
}

fn request_from_header(header: &MealPlan) -> Result<PlanRequest> {
    let day_count = u32::try_from(header.day_count)
        .map_err(|_| anyhow!("plan {} has invalid day count {}", header.id, header.day_count))?;

    Ok(PlanRequest {
        target_calories: header.target_calories,
        target_protein_g: header.target_protein_g,
        target_carbs_g: header.target_carbs_g,
        target_fat_g: header.target_fat_g,
        dietary_restrictions: header.dietary_restrictions.clone(),
        cuisines: header.cuisines.clone(),
        difficulty: header.difficulty,
        max_prep_time_minutes: header.max_prep_time_minutes,
        start_date: header.start_date,
        day_count,
    })
}

fn slot_from_row(row: &PlannedMeal) -> MealSlot {
    MealSlot {
        date: row.meal_date,
        meal_type: row.meal_type,
        recipe_id: row.recipe_id,
        servings: row.servings,
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Store that keeps plans in process memory.
#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    plans: Mutex<HashMap<Uuid, PersistedPlan>>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored plans.
    pub fn len(&self) -> usize {
        self.plans.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn persist(&self, plan: &GeneratedPlan) -> Result<Uuid> {
        let plan_id = Uuid::new_v4();
        let mut meals = plan.meals.clone();
        meals.sort_by_key(|m| (m.date, m.meal_type));

        let stored = PersistedPlan {
            plan_id,
            created_at: Utc::now(),
            request: plan.request.clone(),
            meals,
        };
        self.plans
            .lock()
            .map_err(|_| anyhow!("plan store lock poisoned"))?
            .insert(plan_id, stored);

        Ok(plan_id)
    }

    async fn fetch(&self, plan_id: Uuid) -> Result<Option<PersistedPlan>> {
        let plans = self
            .plans
            .lock()
            .map_err(|_| anyhow!("plan store lock poisoned"))?;
        Ok(plans.get(&plan_id).cloned())
    }
}
