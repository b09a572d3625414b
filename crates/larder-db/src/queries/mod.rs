//! Query functions, one module per table family.

pub mod meal_plans;
pub mod recipes;
