//! Nutrition aggregation: per-day totals, cross-day averages, and variety.

use std::collections::BTreeSet;
use std::ops::AddAssign;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use larder_db::models::Recipe;

use super::GeneratedPlan;

/// A nutrition vector. Used both per serving and for accumulated totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
}

impl Nutrition {
    /// One serving of `recipe`. Non-finite or negative figures count as zero.
    pub fn per_serving(recipe: &Recipe) -> Self {
        Self {
            calories: sanitize(recipe.calories),
            protein_g: sanitize(recipe.protein_g),
            carbs_g: sanitize(recipe.carbs_g),
            fat_g: sanitize(recipe.fat_g),
            fiber_g: sanitize(recipe.fiber_g),
            sugar_g: sanitize(recipe.sugar_g),
            sodium_mg: sanitize(recipe.sodium_mg),
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        let factor = sanitize(factor);
        Self {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
            fiber_g: self.fiber_g * factor,
            sugar_g: self.sugar_g * factor,
            sodium_mg: self.sodium_mg * factor,
        }
    }
}

impl AddAssign for Nutrition {
    fn add_assign(&mut self, rhs: Self) {
        self.calories += rhs.calories;
        self.protein_g += rhs.protein_g;
        self.carbs_g += rhs.carbs_g;
        self.fat_g += rhs.fat_g;
        self.fiber_g += rhs.fiber_g;
        self.sugar_g += rhs.sugar_g;
        self.sodium_mg += rhs.sodium_mg;
    }
}

/// Unrounded totals for one planned day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyNutrition {
    pub date: NaiveDate,
    /// Slots on this date.
    pub meals: usize,
    pub totals: Nutrition,
}

/// Averages across the days that have at least one slot, rounded to whole
/// units, plus the variety score (0..=100).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub avg_calories: i64,
    pub avg_protein_g: i64,
    pub avg_carbs_g: i64,
    pub avg_fat_g: i64,
    pub variety_score: u32,
    pub days: Vec<DailyNutrition>,
}

/// Fold every slot of `plan` into daily totals, averages and a variety
/// score.
///
/// Slots whose recipe is not part of the plan contribute no nutrition but
/// still count toward variety. A plan without slots summarizes to all zeros.
pub fn summarize(plan: &GeneratedPlan) -> NutritionSummary {
    if plan.meals.is_empty() {
        return NutritionSummary::default();
    }

    let days: Vec<DailyNutrition> = plan
        .meals_by_date()
        .into_iter()
        .map(|(date, slots)| {
            let mut totals = Nutrition::default();
            for slot in &slots {
                if let Some(recipe) = plan.recipe_for(slot) {
                    totals += Nutrition::per_serving(recipe).scaled(slot.servings);
                }
            }
            DailyNutrition {
                date,
                meals: slots.len(),
                totals,
            }
        })
        .collect();

    let mut sum = Nutrition::default();
    for day in &days {
        sum += day.totals;
    }
    let day_count = days.len() as f64;

    let distinct: BTreeSet<i64> = plan.meals.iter().map(|m| m.recipe_id).collect();

    NutritionSummary {
        avg_calories: round(sum.calories / day_count),
        avg_protein_g: round(sum.protein_g / day_count),
        avg_carbs_g: round(sum.carbs_g / day_count),
        avg_fat_g: round(sum.fat_g / day_count),
        variety_score: variety_score(distinct.len(), plan.meals.len()),
        days,
    }
}

/// `100 × distinct / total`, rounded; zero when there are no slots.
pub fn variety_score(distinct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let score = (100.0 * distinct.min(total) as f64 / total as f64).round();
    score as u32
}

fn round(value: f64) -> i64 {
    sanitize(value).round() as i64
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use larder_db::models::MealType;

    use super::*;
    use crate::catalog::tests::recipe;
    use crate::plan::MealSlot;
    use crate::request::PlanRequest;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn plan_with(
        days: u32,
        slots: Vec<(u32, MealType, i64, f64)>,
        pool: &[Recipe],
    ) -> GeneratedPlan {
        let meals = slots
            .into_iter()
            .map(|(offset, meal_type, recipe_id, servings)| MealSlot {
                date: start() + chrono::Days::new(u64::from(offset)),
                meal_type,
                recipe_id,
                servings,
            })
            .collect();
        GeneratedPlan::new(PlanRequest::new(2000.0, start(), days), meals, pool)
    }

    #[test]
    fn empty_plan_is_all_zero() {
        let plan = plan_with(1, Vec::new(), &[]);
        let summary = summarize(&plan);
        assert_eq!(summary, NutritionSummary::default());
        assert_eq!(summary.variety_score, 0);
    }

    #[test]
    fn single_recipe_over_six_slots_scores_17() {
        let mut slots = Vec::new();
        for day in 0..2 {
            for meal in MealType::SCHEDULED {
                slots.push((day, meal, 1, 1.0));
            }
        }
        let plan = plan_with(2, slots, &[recipe(1, 600.0)]);
        assert_eq!(summarize(&plan).variety_score, 17);
    }

    #[test]
    fn distinct_recipes_score_100() {
        let pool = [recipe(1, 500.0), recipe(2, 500.0), recipe(3, 500.0)];
        let plan = plan_with(
            1,
            vec![
                (0, MealType::Breakfast, 1, 1.0),
                (0, MealType::Lunch, 2, 1.0),
                (0, MealType::Dinner, 3, 1.0),
            ],
            &pool,
        );
        assert_eq!(summarize(&plan).variety_score, 100);
    }

    #[test]
    fn averages_scale_by_servings_across_days() {
        // recipe(): 20 g protein, 50 g carbs, 15 g fat per serving.
        let pool = [recipe(1, 400.0), recipe(2, 300.0)];
        let plan = plan_with(
            2,
            vec![
                (0, MealType::Breakfast, 1, 1.0),
                (0, MealType::Lunch, 2, 2.0),
                (1, MealType::Dinner, 1, 0.5),
            ],
            &pool,
        );
        let summary = summarize(&plan);

        // Day 1: 400 + 600 = 1000 kcal; day 2: 200 kcal.
        assert_eq!(summary.days.len(), 2);
        assert_eq!(summary.days[0].totals.calories, 1000.0);
        assert_eq!(summary.days[0].meals, 2);
        assert_eq!(summary.days[1].totals.calories, 200.0);
        assert_eq!(summary.avg_calories, 600);
        // Protein: (20 + 40 + 10) / 2 = 35.
        assert_eq!(summary.avg_protein_g, 35);
        // Carbs: (50 + 100 + 25) / 2 = 87.5 → 88.
        assert_eq!(summary.avg_carbs_g, 88);
        assert_eq!(summary.variety_score, 67);
    }

    #[test]
    fn days_without_slots_are_not_averaged() {
        let plan = plan_with(3, vec![(1, MealType::Lunch, 1, 1.0)], &[recipe(1, 900.0)]);
        let summary = summarize(&plan);
        assert_eq!(summary.days.len(), 1);
        assert_eq!(summary.avg_calories, 900);
    }

    #[test]
    fn accumulates_before_rounding() {
        // Three slots of 100.4 kcal sum to 301.2, not 3 × 100.
        let plan = plan_with(
            1,
            vec![
                (0, MealType::Breakfast, 1, 1.0),
                (0, MealType::Lunch, 1, 1.0),
                (0, MealType::Dinner, 1, 1.0),
            ],
            &[recipe(1, 100.4)],
        );
        assert_eq!(summarize(&plan).avg_calories, 301);
    }

    #[test]
    fn unknown_recipe_adds_nothing_but_counts_for_variety() {
        let plan = plan_with(
            1,
            vec![(0, MealType::Breakfast, 1, 1.0), (0, MealType::Lunch, 99, 1.0)],
            &[recipe(1, 500.0)],
        );
        let summary = summarize(&plan);
        assert_eq!(summary.avg_calories, 500);
        assert_eq!(summary.variety_score, 100);
    }

    #[test]
    fn summarizing_twice_is_identical() {
        let pool = [recipe(1, 480.0), recipe(2, 710.0)];
        let plan = plan_with(
            2,
            vec![
                (0, MealType::Breakfast, 1, 1.04),
                (0, MealType::Dinner, 2, 0.98),
                (1, MealType::Lunch, 2, 1.5),
            ],
            &pool,
        );
        assert_eq!(summarize(&plan), summarize(&plan));
    }

    #[test]
    fn bad_figures_count_as_zero() {
        let mut r = recipe(1, f64::NAN);
        r.protein_g = f64::INFINITY;
        let n = Nutrition::per_serving(&r).scaled(2.0);
        assert_eq!(n.calories, 0.0);
        assert_eq!(n.protein_g, 0.0);
        assert_eq!(n.carbs_g, 100.0);
    }
}
