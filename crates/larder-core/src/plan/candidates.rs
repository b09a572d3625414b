//! Candidate pool: the recipes eligible for a request, before any per-slot
//! selection.

use tracing::debug;

use larder_db::models::Recipe;

use crate::catalog::RecipeCatalog;
use crate::error::PlanError;
use crate::request::PlanRequest;

/// Query the catalog with the filters derived from `request`.
///
/// An empty pool is a normal outcome of an over-constrained request and is
/// returned as such; deciding that a plan cannot be built from it is the
/// caller's job. A catalog that cannot be queried is
/// [`PlanError::CatalogUnavailable`].
pub async fn build_candidate_pool(
    catalog: &dyn RecipeCatalog,
    request: &PlanRequest,
) -> Result<Vec<Recipe>, PlanError> {
    let filter = request.recipe_filter();
    let pool = catalog
        .find_recipes(&filter)
        .await
        .map_err(PlanError::catalog)?;

    debug!(
        candidates = pool.len(),
        unfiltered = filter.is_unfiltered(),
        "built candidate pool"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use larder_db::queries::recipes::RecipeFilter;

    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::catalog::tests::recipe;

    struct DownCatalog;

    #[async_trait]
    impl RecipeCatalog for DownCatalog {
        async fn find_recipes(&self, _filter: &RecipeFilter) -> Result<Vec<Recipe>> {
            Err(anyhow!("connection refused"))
        }

        async fn recipes_by_ids(&self, _ids: &[i64]) -> Result<Vec<Recipe>> {
            Err(anyhow!("connection refused"))
        }
    }

    fn request() -> PlanRequest {
        PlanRequest::new(2000.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 1)
    }

    #[tokio::test]
    async fn unreachable_catalog_is_an_error() {
        let err = build_candidate_pool(&DownCatalog, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn over_constrained_request_yields_empty_pool() {
        let catalog = MemoryCatalog::new(vec![recipe(1, 500.0)]);
        let mut req = request();
        req.dietary_restrictions = vec!["paleo".into()];

        let pool = build_candidate_pool(&catalog, &req).await.unwrap();
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn unconstrained_request_gets_whole_catalog() {
        let catalog = MemoryCatalog::new(vec![recipe(1, 500.0), recipe(2, 700.0)]);
        let pool = build_candidate_pool(&catalog, &request()).await.unwrap();
        assert_eq!(pool.len(), 2);
    }
}
