use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use shopfront_core::domain::product::{CategorySlug, Product};
use shopfront_core::errors::ApplicationError;
use shopfront_db::repositories::CatalogFilter;

use crate::state::{error_reply, new_correlation_id, reject, AppState, ErrorReply};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryView>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.0,
            slug: product.slug,
            name: product.name,
            description: product.description,
            price: product.price.to_string(),
            category: product.category.0,
        }
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductListResponse>, ErrorReply> {
    let correlation_id = new_correlation_id();

    let filter = CatalogFilter {
        search: query.q,
        category: query.category.map(CategorySlug),
    };

    let products = state
        .catalog
        .list_products(filter)
        .await
        .map_err(|err| ApplicationError::Persistence(err.to_string()))
        .map_err(|err| error_reply(err, &correlation_id))?;
    let categories = state
        .catalog
        .list_categories()
        .await
        .map_err(|err| ApplicationError::Persistence(err.to_string()))
        .map_err(|err| error_reply(err, &correlation_id))?;

    info!(
        event_name = "catalog.listed",
        correlation_id = %correlation_id,
        product_count = products.len(),
        "served product listing"
    );

    Ok(Json(ProductListResponse {
        products: products.into_iter().map(ProductView::from).collect(),
        categories: categories
            .into_iter()
            .map(|category| CategoryView { slug: category.slug.0, name: category.name })
            .collect(),
    }))
}

pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductView>, ErrorReply> {
    let correlation_id = new_correlation_id();

    let product = state
        .catalog
        .find_by_slug(&slug)
        .await
        .map_err(|err| ApplicationError::Persistence(err.to_string()))
        .map_err(|err| error_reply(err, &correlation_id))?;

    match product {
        Some(product) => Ok(Json(ProductView::from(product))),
        None => Err(reject(
            StatusCode::NOT_FOUND,
            "The requested item could not be found.",
            &correlation_id,
        )),
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;

    use shopfront_db::repositories::CatalogRepository;

    use super::{list_products, product_detail, ListQuery};
    use crate::testing::{sample_product, seed_catalog, test_state};

    #[tokio::test]
    async fn listing_returns_products_and_categories() {
        let state = test_state();
        seed_catalog(
            &state,
            vec![
                sample_product("1", "espresso-beans", 1999),
                sample_product("2", "filter-papers", 450),
            ],
        )
        .await;

        let response = list_products(State(state), Query(ListQuery::default()))
            .await
            .expect("listing succeeds");

        assert_eq!(response.0.products.len(), 2);
        assert_eq!(response.0.categories.len(), 1);
        assert_eq!(response.0.categories[0].slug, "coffee");
    }

    #[tokio::test]
    async fn listing_applies_search_filter() {
        let state = test_state();
        seed_catalog(
            &state,
            vec![
                sample_product("1", "espresso-beans", 1999),
                sample_product("2", "filter-papers", 450),
            ],
        )
        .await;

        let query = ListQuery { q: Some("espresso".to_string()), category: None };
        let response = list_products(State(state), Query(query)).await.expect("listing succeeds");

        assert_eq!(response.0.products.len(), 1);
        assert_eq!(response.0.products[0].slug, "espresso-beans");
    }

    #[tokio::test]
    async fn listing_excludes_unavailable_products() {
        let state = test_state();
        let mut retired = sample_product("3", "retired-grinder", 8900);
        retired.available = false;
        seed_catalog(&state, vec![sample_product("1", "espresso-beans", 1999)]).await;
        state.catalog.save_product(retired).await.expect("save");

        let response = list_products(State(state), Query(ListQuery::default()))
            .await
            .expect("listing succeeds");

        assert_eq!(response.0.products.len(), 1);
    }

    #[tokio::test]
    async fn detail_serves_price_as_string() {
        let state = test_state();
        seed_catalog(&state, vec![sample_product("1", "espresso-beans", 1999)]).await;

        let response = product_detail(State(state), Path("espresso-beans".to_string()))
            .await
            .expect("detail succeeds");

        assert_eq!(response.0.price, "19.99");
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let state = test_state();
        seed_catalog(&state, Vec::new()).await;

        let error = product_detail(State(state), Path("missing".to_string()))
            .await
            .expect_err("should be rejected");

        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }
}
