//! The larder meal-plan engine.
//!
//! Generation is a straight pipeline: the candidate pool is built from the
//! recipe catalog, every (day, meal) slot gets a recipe and a serving
//! multiplier, the plan is summarized, feedback is derived from the summary,
//! and the plan is persisted. See [`plan::generate_plan`].

pub mod catalog;
pub mod error;
pub mod plan;
pub mod request;
pub mod store;

pub use error::PlanError;
pub use request::PlanRequest;
