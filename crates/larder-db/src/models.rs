use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How hard a recipe is to prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyParseError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(DifficultyParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Difficulty`] string.
#[derive(Debug, Clone)]
pub struct DifficultyParseError(pub String);

impl fmt::Display for DifficultyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid difficulty: {:?} (expected easy, medium, or hard)",
            self.0
        )
    }
}

impl std::error::Error for DifficultyParseError {}

// ---------------------------------------------------------------------------

/// The meal a slot belongs to.
///
/// Variant order is the display order used when reading a plan back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Every meal type in display order.
    pub const ALL: [MealType; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    /// Meal types that plan generation schedules a slot for.
    ///
    /// Snack keeps its share of the daily calorie budget but is not scheduled.
    pub const SCHEDULED: [MealType; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];

    /// Fraction of the daily calorie target allotted to this meal.
    pub const fn calorie_share(self) -> f64 {
        match self {
            Self::Breakfast => 0.25,
            Self::Lunch => 0.35,
            Self::Dinner => 0.35,
            Self::Snack => 0.05,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        };
        f.write_str(s)
    }
}

impl FromStr for MealType {
    type Err = MealTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            other => Err(MealTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MealType`] string.
#[derive(Debug, Clone)]
pub struct MealTypeParseError(pub String);

impl fmt::Display for MealTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid meal type: {:?}", self.0)
    }
}

impl std::error::Error for MealTypeParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A catalog recipe. Nutrition figures are per serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub dietary_tags: Vec<String>,
    pub cuisine: String,
    pub difficulty: Difficulty,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub servings: i32,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Total hands-on plus cooking time.
    pub fn total_time_minutes(&self) -> i32 {
        self.prep_time_minutes + self.cook_time_minutes
    }
}

/// A persisted plan header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealPlan {
    pub id: Uuid,
    pub target_calories: f64,
    pub target_protein_g: Option<f64>,
    pub target_carbs_g: Option<f64>,
    pub target_fat_g: Option<f64>,
    pub dietary_restrictions: Vec<String>,
    pub cuisines: Vec<String>,
    pub difficulty: Option<Difficulty>,
    pub max_prep_time_minutes: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_count: i32,
    pub created_at: DateTime<Utc>,
}

/// A persisted meal slot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlannedMeal {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub meal_date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: i64,
    pub servings: f64,
}
