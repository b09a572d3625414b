use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use larder_core::PlanError;
use larder_core::PlanRequest;
use larder_core::catalog::PgRecipeCatalog;
use larder_core::plan::{GeneratedPlan, NutritionSummary, generate_plan, load_plan, suggest};
use larder_core::store::PgPlanStore;
use larder_db::models::MealPlan;
use larder_db::queries::meal_plans as plan_db;

use crate::plan_cmds::plan_rng;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PlanError::NoEligibleRecipes => StatusCode::UNPROCESSABLE_ENTITY,
            PlanError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            PlanError::CatalogUnavailable(_) | PlanError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PlanError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err_chain(&err), "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Flatten an error and its sources into one message for the log.
fn err_chain(err: &PlanError) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PlanListItem {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub meal_count: i64,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub plan: GeneratedPlan,
    pub summary: NutritionSummary,
    pub suggestions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    /// Pinned seed for generation; `None` draws a fresh seed per request.
    seed: Option<u64>,
}

pub fn build_router(pool: PgPool, seed: Option<u64>) -> Router {
    Router::new()
        .route("/api/plans", get(list_plans).post(create_plan))
        .route("/api/plans/{id}", get(get_plan))
        .layer(CorsLayer::permissive())
        .with_state(AppState { pool, seed })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, seed: Option<u64>, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool, seed);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("larder serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("larder serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_plans(State(state): State<AppState>) -> Result<axum::response::Response, AppError> {
    let plans = plan_db::list_meal_plans(&state.pool)
        .await
        .map_err(AppError::internal)?;
    let counts = plan_db::count_planned_meals(&state.pool)
        .await
        .map_err(AppError::internal)?;

    let items: Vec<PlanListItem> = plans
        .into_iter()
        .map(|plan| {
            let meal_count = counts
                .iter()
                .find(|(id, _)| *id == plan.id)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            PlanListItem { plan, meal_count }
        })
        .collect();

    Ok(Json(items).into_response())
}

async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let catalog = PgRecipeCatalog::new(state.pool.clone());
    let store = PgPlanStore::new(state.pool.clone());
    let loaded = load_plan(&catalog, &store, id).await?;
    let suggestions = suggest(&loaded.summary, &loaded.plan.request);

    Ok(Json(PlanResponse {
        plan_id: loaded.plan_id,
        created_at: Some(loaded.created_at),
        plan: loaded.plan,
        summary: loaded.summary,
        suggestions,
    })
    .into_response())
}

async fn create_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> Result<axum::response::Response, AppError> {
    let catalog = PgRecipeCatalog::new(state.pool.clone());
    let store = PgPlanStore::new(state.pool.clone());
    let (mut rng, seed) = plan_rng(state.seed);
    tracing::debug!(seed, "generating meal plan over HTTP");

    let outcome = generate_plan(&catalog, &store, &request, &mut rng).await?;

    Ok((
        StatusCode::CREATED,
        Json(PlanResponse {
            plan_id: outcome.plan_id,
            created_at: None,
            plan: outcome.plan,
            summary: outcome.summary,
            suggestions: outcome.suggestions,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
