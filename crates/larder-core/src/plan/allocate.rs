//! Slot allocation: one recipe and a serving multiplier per (day, meal).
//!
//! Each scheduled meal gets a calorie budget equal to its share of the daily
//! target. Recipes whose per-serving calories fall within
//! [`CALORIE_TOLERANCE`] of that budget are preferred; if none do, any
//! recipe in the pool may be drawn. The draw is uniform and uses the
//! caller's random source so a seeded generator reproduces a plan exactly.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use larder_db::models::{MealType, Recipe};

use super::MealSlot;
use crate::error::PlanError;
use crate::request::PlanRequest;

/// Relative half-width of the calorie band around a meal's budget.
pub const CALORIE_TOLERANCE: f64 = 0.30;

/// Smallest serving multiplier a slot may use.
pub const MIN_SERVINGS: f64 = 0.5;

/// Largest serving multiplier a slot may use.
pub const MAX_SERVINGS: f64 = 3.0;

/// Assign a recipe to every scheduled meal of every day in the request.
///
/// Slots come out ordered by date, then breakfast, lunch, dinner. An empty
/// pool fails with [`PlanError::NoEligibleRecipes`] before any slot is made.
pub fn allocate<R>(
    request: &PlanRequest,
    pool: &[Recipe],
    rng: &mut R,
) -> Result<Vec<MealSlot>, PlanError>
where
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return Err(PlanError::NoEligibleRecipes);
    }

    let mut slots = Vec::with_capacity(request.day_count as usize * MealType::SCHEDULED.len());

    for date in request.dates() {
        for meal_type in MealType::SCHEDULED {
            let budget = meal_calorie_target(request.target_calories, meal_type);
            let suitable: Vec<&Recipe> = pool
                .iter()
                .filter(|r| within_band(r.calories, budget))
                .collect();

            let fell_back = suitable.is_empty();
            let recipe = if fell_back {
                pool.choose(rng)
            } else {
                suitable.choose(rng).copied()
            }
            .ok_or(PlanError::NoEligibleRecipes)?;

            let servings = serving_multiplier(budget, recipe.calories);
            debug!(
                %date,
                meal = %meal_type,
                recipe_id = recipe.id,
                servings,
                band_matches = suitable.len(),
                fell_back,
                "allocated slot"
            );

            slots.push(MealSlot {
                date,
                meal_type,
                recipe_id: recipe.id,
                servings,
            });
        }
    }

    Ok(slots)
}

/// Calorie budget of one meal given the daily target.
pub fn meal_calorie_target(daily_calories: f64, meal_type: MealType) -> f64 {
    daily_calories * meal_type.calorie_share()
}

/// Whether `calories` lies within the tolerance band around `budget`.
pub fn within_band(calories: f64, budget: f64) -> bool {
    let slack = budget * CALORIE_TOLERANCE;
    calories >= budget - slack && calories <= budget + slack
}

/// Servings needed to approximate `budget`, clamped to
/// `[MIN_SERVINGS, MAX_SERVINGS]`.
///
/// A recipe with no calories can never reach the budget, so it gets the
/// maximum.
pub fn serving_multiplier(budget: f64, calories_per_serving: f64) -> f64 {
    if calories_per_serving <= 0.0 || !calories_per_serving.is_finite() {
        return MAX_SERVINGS;
    }
    let ratio = budget / calories_per_serving;
    if ratio.is_nan() {
        return MIN_SERVINGS;
    }
    ratio.clamp(MIN_SERVINGS, MAX_SERVINGS)
}
