//! Rule-based feedback on a summarized plan.

use super::nutrition::NutritionSummary;
use crate::request::PlanRequest;

/// Relative calorie deviation from target that triggers portion advice.
pub const CALORIE_DEVIATION: f64 = 0.10;
/// Variety below this asks for more recipes.
pub const LOW_VARIETY: u32 = 60;
/// Variety above this earns a positive note.
pub const HIGH_VARIETY: u32 = 80;
/// Fraction of the protein goal below which protein advice is given.
pub const PROTEIN_FLOOR: f64 = 0.8;

pub const HYDRATION_REMINDER: &str =
    "Drink water throughout the day; aim for about eight glasses.";
pub const MEAL_PREP_REMINDER: &str =
    "Batch-prepare ingredients ahead of time to make the week's meals easier.";

/// Evaluate the rules in order and return one message per rule that fires,
/// followed by the two standing reminders. Never fails.
pub fn suggest(summary: &NutritionSummary, request: &PlanRequest) -> Vec<String> {
    let mut out = Vec::new();

    let target = finite(request.target_calories);
    let actual = summary.avg_calories as f64;
    if (actual - target).abs() > CALORIE_DEVIATION * target {
        if actual > target {
            out.push(format!(
                "Average intake of {actual:.0} kcal is above your {target:.0} kcal target; \
                 reduce portions or choose lower-calorie recipes."
            ));
        } else {
            out.push(format!(
                "Average intake of {actual:.0} kcal is below your {target:.0} kcal target; \
                 increase portions or add snacks."
            ));
        }
    }

    // A plan without slots has no variety to judge.
    match summary.variety_score {
        _ if summary.days.is_empty() => {}
        score if score < LOW_VARIETY => out.push(format!(
            "Variety score is {score}; try exploring more recipes to diversify your meals."
        )),
        score if score > HIGH_VARIETY => out.push(format!(
            "Great variety ({score})! Your plan rotates through plenty of different recipes."
        )),
        _ => {}
    }

    let protein_goal = finite(request.effective_protein_target());
    let protein = summary.avg_protein_g as f64;
    if protein < PROTEIN_FLOOR * protein_goal {
        out.push(format!(
            "Average protein of {protein:.0} g is short of your {protein_goal:.0} g goal; \
             add protein-rich foods such as legumes, eggs, fish or lean meat."
        ));
    }

    out.push(HYDRATION_REMINDER.to_string());
    out.push(MEAL_PREP_REMINDER.to_string());
    out
}

fn finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
