//! Meal-plan generation: candidate pool, slot allocation, nutrition
//! summary, feedback, and the service layer tying them to storage.

pub mod allocate;
pub mod candidates;
pub mod nutrition;
pub mod service;
pub mod suggest;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use larder_db::models::{MealType, Recipe};

use crate::request::PlanRequest;

pub use allocate::{MAX_SERVINGS, MIN_SERVINGS, allocate, serving_multiplier};
pub use candidates::build_candidate_pool;
pub use nutrition::{DailyNutrition, Nutrition, NutritionSummary, summarize};
pub use service::{LoadedPlan, PlanOutcome, generate_plan, load_plan};
pub use suggest::suggest;

/// One (date, meal type) assignment of a recipe and a serving multiplier.
///
/// A slot has no nutrition of its own; it is the recipe's per-serving
/// nutrition times `servings`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealSlot {
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: i64,
    pub servings: f64,
}

/// A complete plan: the request it answers, its date range, its slots, and
/// the recipes those slots reference.
///
/// Never mutated once built; regenerating produces a new plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub request: PlanRequest,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub meals: Vec<MealSlot>,
    pub recipes: BTreeMap<i64, Recipe>,
}

impl GeneratedPlan {
    /// Assemble a plan from its slots, keeping only the recipes they use.
    pub fn new<'a>(
        request: PlanRequest,
        meals: Vec<MealSlot>,
        recipes: impl IntoIterator<Item = &'a Recipe>,
    ) -> Self {
        let recipes: BTreeMap<i64, Recipe> = recipes
            .into_iter()
            .filter(|r| meals.iter().any(|m| m.recipe_id == r.id))
            .map(|r| (r.id, r.clone()))
            .collect();
        let start_date = request.start_date;
        let end_date = request.end_date().unwrap_or(start_date);

        Self {
            request,
            start_date,
            end_date,
            meals,
            recipes,
        }
    }

    /// The recipe a slot points at, if it is known to this plan.
    pub fn recipe_for(&self, slot: &MealSlot) -> Option<&Recipe> {
        self.recipes.get(&slot.recipe_id)
    }

    /// Slots grouped by date, in date order.
    pub fn meals_by_date(&self) -> BTreeMap<NaiveDate, Vec<&MealSlot>> {
        let mut grouped: BTreeMap<NaiveDate, Vec<&MealSlot>> = BTreeMap::new();
        for slot in &self.meals {
            grouped.entry(slot.date).or_default().push(slot);
        }
        grouped
    }
}
