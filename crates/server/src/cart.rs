use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use shopfront_core::cart::{LineStatus, ProductLookup, SessionCart};
use shopfront_core::domain::product::ProductId;
use shopfront_core::errors::ApplicationError;

use crate::catalog::ProductView;
use crate::sessions;
use crate::state::{error_reply, new_correlation_id, reject, AppState, ErrorReply};

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub override_quantity: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub product_id: String,
    pub product: Option<ProductView>,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
    pub status: LineStatus,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    pub total_price: String,
}

pub async fn build_cart_view(
    cart: &SessionCart<'_>,
    lookup: &dyn ProductLookup,
) -> Result<CartView, ApplicationError> {
    let items = cart.items(lookup).await?;
    Ok(CartView {
        item_count: cart.len(),
        total_price: cart.total_price().to_string(),
        items: items
            .into_iter()
            .map(|item| CartItemView {
                product_id: item.product_id.0,
                product: item.product.map(ProductView::from),
                unit_price: item.unit_price.to_string(),
                quantity: item.quantity,
                line_total: item.line_total.to_string(),
                status: item.status,
            })
            .collect(),
    })
}

pub async fn cart_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<CartView>), ErrorReply> {
    let correlation_id = new_correlation_id();

    let mut handle = sessions::open(&state, &headers)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    let view = {
        let cart = SessionCart::load(&mut handle.session, &state.store.cart_session_key);
        build_cart_view(&cart, state.lookup.as_ref())
            .await
            .map_err(|err| error_reply(err, &correlation_id))?
    };

    let response_headers = sessions::commit(&state, handle)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    Ok((response_headers, Json(view)))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AddItemRequest>,
) -> Result<(HeaderMap, Json<CartView>), ErrorReply> {
    let correlation_id = new_correlation_id();

    if request.quantity == 0 {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "quantity must be at least 1",
            &correlation_id,
        ));
    }

    let product_id = ProductId(product_id);
    let product = state
        .lookup
        .find_available(&product_id)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?
        .ok_or_else(|| {
            reject(
                StatusCode::NOT_FOUND,
                "The requested item could not be found.",
                &correlation_id,
            )
        })?;

    let mut handle = sessions::open(&state, &headers)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    let view = {
        let mut cart = SessionCart::load(&mut handle.session, &state.store.cart_session_key);
        cart.add(&product, request.quantity, request.override_quantity);

        info!(
            event_name = "cart.item_added",
            correlation_id = %correlation_id,
            product_id = %product.id.0,
            quantity = request.quantity,
            override_quantity = request.override_quantity,
            "cart line updated"
        );

        build_cart_view(&cart, state.lookup.as_ref())
            .await
            .map_err(|err| error_reply(err, &correlation_id))?
    };

    let response_headers = sessions::commit(&state, handle)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    Ok((response_headers, Json(view)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<CartView>), ErrorReply> {
    let correlation_id = new_correlation_id();

    let mut handle = sessions::open(&state, &headers)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    let view = {
        let mut cart = SessionCart::load(&mut handle.session, &state.store.cart_session_key);
        cart.remove(&ProductId(product_id.clone()));

        info!(
            event_name = "cart.item_removed",
            correlation_id = %correlation_id,
            product_id = %product_id,
            "cart line removed"
        );

        build_cart_view(&cart, state.lookup.as_ref())
            .await
            .map_err(|err| error_reply(err, &correlation_id))?
    };

    let response_headers = sessions::commit(&state, handle)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    Ok((response_headers, Json(view)))
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, State};
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use axum::Json;

    use shopfront_core::cart::LineStatus;
    use shopfront_db::repositories::CatalogRepository;

    use super::{add_item, cart_detail, remove_item, AddItemRequest};
    use crate::testing::{sample_product, seed_catalog, test_state};

    fn carry_cookie(response_headers: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(set_cookie) = response_headers.get(header::SET_COOKIE) {
            let cookie = set_cookie
                .to_str()
                .expect("cookie header")
                .split(';')
                .next()
                .expect("cookie pair")
                .to_string();
            headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).expect("header"));
        }
        headers
    }

    fn add_request(quantity: u32, override_quantity: bool) -> Json<AddItemRequest> {
        Json(AddItemRequest { quantity, override_quantity })
    }

    #[tokio::test]
    async fn empty_cart_detail_is_empty() {
        let state = test_state();
        let (_, Json(view)) =
            cart_detail(State(state), HeaderMap::new()).await.expect("detail succeeds");

        assert!(view.items.is_empty());
        assert_eq!(view.item_count, 0);
        assert_eq!(view.total_price, "0.00");
    }

    #[tokio::test]
    async fn adding_accumulates_quantity_across_requests() {
        let state = test_state();
        seed_catalog(&state, vec![sample_product("7", "espresso-beans", 1999)]).await;

        let (headers, Json(first)) = add_item(
            State(state.clone()),
            Path("7".to_string()),
            HeaderMap::new(),
            add_request(2, false),
        )
        .await
        .expect("first add");
        assert_eq!(first.item_count, 2);
        assert_eq!(first.total_price, "39.98");

        let cookie = carry_cookie(&headers);
        let (_, Json(second)) =
            add_item(State(state), Path("7".to_string()), cookie, add_request(1, false))
                .await
                .expect("second add");
        assert_eq!(second.item_count, 3);
        assert_eq!(second.total_price, "59.97");
    }

    #[tokio::test]
    async fn override_replaces_quantity() {
        let state = test_state();
        seed_catalog(&state, vec![sample_product("7", "espresso-beans", 1999)]).await;

        let (headers, _) = add_item(
            State(state.clone()),
            Path("7".to_string()),
            HeaderMap::new(),
            add_request(5, false),
        )
        .await
        .expect("first add");

        let cookie = carry_cookie(&headers);
        let (_, Json(view)) =
            add_item(State(state), Path("7".to_string()), cookie, add_request(3, true))
                .await
                .expect("override add");
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total_price, "59.97");
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let state = test_state();
        seed_catalog(&state, vec![sample_product("7", "espresso-beans", 1999)]).await;

        let error =
            add_item(State(state), Path("7".to_string()), HeaderMap::new(), add_request(0, false))
                .await
                .expect_err("should be rejected");
        assert_eq!(error.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn adding_unknown_or_unavailable_product_is_not_found() {
        let state = test_state();
        let mut retired = sample_product("9", "retired-grinder", 8900);
        retired.available = false;
        seed_catalog(&state, vec![retired]).await;

        let missing = add_item(
            State(state.clone()),
            Path("404".to_string()),
            HeaderMap::new(),
            add_request(1, false),
        )
        .await
        .expect_err("unknown product rejected");
        assert_eq!(missing.0, StatusCode::NOT_FOUND);

        let unavailable =
            add_item(State(state), Path("9".to_string()), HeaderMap::new(), add_request(1, false))
                .await
                .expect_err("unavailable product rejected");
        assert_eq!(unavailable.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn removing_a_line_then_detail_shows_remaining_lines() {
        let state = test_state();
        seed_catalog(
            &state,
            vec![
                sample_product("7", "espresso-beans", 1999),
                sample_product("8", "filter-papers", 450),
            ],
        )
        .await;

        let (headers, _) = add_item(
            State(state.clone()),
            Path("7".to_string()),
            HeaderMap::new(),
            add_request(2, false),
        )
        .await
        .expect("add first");
        let cookie = carry_cookie(&headers);
        add_item(State(state.clone()), Path("8".to_string()), cookie.clone(), add_request(1, false))
            .await
            .expect("add second");

        remove_item(State(state.clone()), Path("7".to_string()), cookie.clone())
            .await
            .expect("remove");

        let (_, Json(view)) = cart_detail(State(state), cookie).await.expect("detail");
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_id, "8");
        assert_eq!(view.total_price, "4.50");
    }

    #[tokio::test]
    async fn withdrawn_product_surfaces_as_missing_in_detail() {
        let state = test_state();
        let product = sample_product("7", "espresso-beans", 1999);
        seed_catalog(&state, vec![product.clone()]).await;

        let (headers, _) = add_item(
            State(state.clone()),
            Path("7".to_string()),
            HeaderMap::new(),
            add_request(1, false),
        )
        .await
        .expect("add");

        let mut withdrawn = product;
        withdrawn.available = false;
        state.catalog.save_product(withdrawn).await.expect("withdraw");

        let cookie = carry_cookie(&headers);
        let (_, Json(view)) = cart_detail(State(state), cookie).await.expect("detail");

        assert_eq!(view.items.len(), 1, "line survives product withdrawal");
        assert_eq!(view.items[0].status, LineStatus::ProductMissing);
        assert!(view.items[0].product.is_none());
    }
}
