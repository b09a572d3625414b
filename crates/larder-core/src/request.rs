//! The caller-supplied targets and constraints for one generation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use larder_db::models::Difficulty;
use larder_db::queries::recipes::RecipeFilter;

use crate::error::PlanError;

/// Longest plan a single request may ask for: one leap year.
pub const MAX_PLAN_DAYS: u32 = 366;

fn default_day_count() -> u32 {
    1
}

/// Targets and constraints for one meal-plan generation.
///
/// Dietary restrictions and cuisines are each a logical OR: a recipe matches
/// if it carries any listed tag or belongs to any listed cuisine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub target_calories: f64,
    #[serde(default)]
    pub target_protein_g: Option<f64>,
    #[serde(default)]
    pub target_carbs_g: Option<f64>,
    #[serde(default)]
    pub target_fat_g: Option<f64>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub max_prep_time_minutes: Option<i32>,
    pub start_date: NaiveDate,
    #[serde(default = "default_day_count")]
    pub day_count: u32,
}

impl PlanRequest {
    /// A request with only the required fields set.
    pub fn new(target_calories: f64, start_date: NaiveDate, day_count: u32) -> Self {
        Self {
            target_calories,
            target_protein_g: None,
            target_carbs_g: None,
            target_fat_g: None,
            dietary_restrictions: Vec::new(),
            cuisines: Vec::new(),
            difficulty: None,
            max_prep_time_minutes: None,
            start_date,
            day_count,
        }
    }

    /// Check the request and return a normalized copy.
    ///
    /// Tags and cuisines are trimmed, lower-cased, and de-duplicated; blank
    /// entries are dropped.
    pub fn validated(&self) -> Result<Self, PlanError> {
        if !self.target_calories.is_finite() || self.target_calories <= 0.0 {
            return Err(invalid(format!(
                "target calories must be a positive number, got {}",
                self.target_calories
            )));
        }

        for (name, value) in [
            ("protein", self.target_protein_g),
            ("carbs", self.target_carbs_g),
            ("fat", self.target_fat_g),
        ] {
            match value {
                Some(v) if !v.is_finite() || v < 0.0 => {
                    return Err(invalid(format!(
                        "target {name} must be a non-negative number, got {v}"
                    )));
                }
                _ => {}
            }
        }

        if self.day_count == 0 || self.day_count > MAX_PLAN_DAYS {
            return Err(invalid(format!(
                "day count must be between 1 and {MAX_PLAN_DAYS}, got {}",
                self.day_count
            )));
        }

        if let Some(minutes) = self.max_prep_time_minutes.filter(|m| *m <= 0) {
            return Err(invalid(format!(
                "max prep time must be positive, got {minutes}"
            )));
        }

        if self.end_date().is_none() {
            return Err(invalid(format!(
                "a {}-day plan starting {} runs past the last representable date",
                self.day_count, self.start_date
            )));
        }

        Ok(Self {
            dietary_restrictions: normalize_labels(&self.dietary_restrictions),
            cuisines: normalize_labels(&self.cuisines),
            ..self.clone()
        })
    }

    /// Last planned date (`start_date + day_count - 1`).
    ///
    /// `None` when `day_count` is zero or the range overflows the calendar.
    pub fn end_date(&self) -> Option<NaiveDate> {
        let extra = self.day_count.checked_sub(1)?;
        self.start_date.checked_add_days(Days::new(u64::from(extra)))
    }

    /// Every planned date, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date.iter_days().take(self.day_count as usize)
    }

    /// The catalog query derived from this request's constraints.
    pub fn recipe_filter(&self) -> RecipeFilter {
        RecipeFilter {
            dietary_tags: non_empty(&self.dietary_restrictions),
            cuisines: non_empty(&self.cuisines),
            difficulty: self.difficulty,
            max_prep_time_minutes: self.max_prep_time_minutes,
        }
    }

    /// Protein goal in grams: the explicit target, or 15% of calories at
    /// 4 kcal per gram.
    pub fn effective_protein_target(&self) -> f64 {
        self.target_protein_g
            .unwrap_or(self.target_calories * 0.15 / 4.0)
    }
}

fn invalid(message: String) -> PlanError {
    PlanError::InvalidRequest(message)
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn normalize_labels(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let label = value.trim().to_lowercase();
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}
