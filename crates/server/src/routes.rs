use axum::routing::{get, post};
use axum::Router;

use shopfront_db::DbPool;

use crate::state::AppState;
use crate::{cart, catalog, checkout, health};

/// Storefront surface:
/// - `GET  /products`                        — catalog listing (`q`, `category`)
/// - `GET  /products/{slug}`                 — product detail
/// - `GET  /cart`                            — current cart
/// - `POST /cart/items/{product_id}`         — add or update a line
/// - `POST /cart/items/{product_id}/remove`  — drop a line
/// - `POST /checkout`                        — place an order
/// - `GET  /checkout/success`                — one-shot confirmation
/// - `GET  /health`                          — readiness probe
pub fn router(state: AppState, db_pool: DbPool) -> Router {
    let storefront = Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/{slug}", get(catalog::product_detail))
        .route("/cart", get(cart::cart_detail))
        .route("/cart/items/{product_id}", post(cart::add_item))
        .route("/cart/items/{product_id}/remove", post(cart::remove_item))
        .route("/checkout", post(checkout::checkout))
        .route("/checkout/success", get(checkout::checkout_success))
        .with_state(state);

    storefront.merge(health::router(db_pool))
}
