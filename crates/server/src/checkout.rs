use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use shopfront_core::cart::SessionCart;
use shopfront_core::domain::order::{order_total, Order, OrderDraft, OrderId, OrderLine};
use shopfront_core::errors::ApplicationError;

use crate::sessions;
use crate::state::{error_reply, new_correlation_id, reject, AppState, ErrorReply};

const ORDER_ID_SESSION_KEY: &str = "order_id";

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub total: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub lines: Vec<OrderLineView>,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSuccessResponse {
    pub order: Option<OrderView>,
}

fn order_view(order: Order, lines: Vec<OrderLine>) -> OrderView {
    OrderView {
        id: order.id.0,
        customer_name: order.customer_name,
        email: order.email,
        phone: order.phone,
        address: order.address,
        notes: order.notes,
        created_at: order.created_at.to_rfc3339(),
        total: order_total(&lines).to_string(),
        lines: lines
            .into_iter()
            .map(|line| OrderLineView {
                product_id: line.product_id.0.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price.to_string(),
                line_total: line.line_total().to_string(),
            })
            .collect(),
    }
}

pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<(HeaderMap, Json<CheckoutResponse>), ErrorReply> {
    let correlation_id = new_correlation_id();

    let draft = OrderDraft {
        customer_name: request.customer_name,
        email: request.email,
        phone: request.phone,
        address: request.address,
        notes: request.notes.filter(|notes| !notes.trim().is_empty()),
    };
    if let Err(error) = draft.validate() {
        return Err(reject(StatusCode::BAD_REQUEST, error.to_string(), &correlation_id));
    }

    let mut handle = sessions::open(&state, &headers)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    let (order, lines) = {
        let mut cart = SessionCart::load(&mut handle.session, &state.store.cart_session_key);
        if cart.is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "cart is empty", &correlation_id));
        }

        let items = cart
            .items(state.lookup.as_ref())
            .await
            .map_err(|err| error_reply(err, &correlation_id))?;

        let lines: Vec<OrderLine> = items
            .into_iter()
            .filter(|item| item.quantity > 0)
            .map(|item| OrderLine {
                product_name: item
                    .product
                    .as_ref()
                    .map(|product| product.name.clone())
                    .unwrap_or_else(|| item.product_id.0.clone()),
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        let order = state
            .orders
            .create(draft, lines.clone())
            .await
            .map_err(|err| ApplicationError::Persistence(err.to_string()))
            .map_err(|err| error_reply(err, &correlation_id))?;

        if let Err(error) = state.notifier.order_placed(&order, &lines).await {
            warn!(
                event_name = "checkout.notify_failed",
                correlation_id = %correlation_id,
                order_id = %order.id.0,
                error = %error,
                "order recorded but notification failed"
            );
            return Err(reject(
                StatusCode::BAD_GATEWAY,
                "The order was recorded but the confirmation mail could not be sent.",
                &correlation_id,
            ));
        }

        cart.clear();
        (order, lines)
    };

    handle.session.insert(ORDER_ID_SESSION_KEY, Value::String(order.id.0.clone()));

    let response_headers = sessions::commit(&state, handle)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    info!(
        event_name = "checkout.order_placed",
        correlation_id = %correlation_id,
        order_id = %order.id.0,
        line_count = lines.len(),
        "order placed"
    );

    Ok((
        response_headers,
        Json(CheckoutResponse {
            order_id: order.id.0,
            total: order_total(&lines).to_string(),
        }),
    ))
}

/// One-shot confirmation view. The order id is taken out of the session, so
/// a refresh shows nothing.
pub async fn checkout_success(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<CheckoutSuccessResponse>), ErrorReply> {
    let correlation_id = new_correlation_id();

    let mut handle = sessions::open(&state, &headers)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    let order_id = handle
        .session
        .remove(ORDER_ID_SESSION_KEY)
        .and_then(|value| value.as_str().map(|id| OrderId(id.to_string())));

    let order = match order_id {
        Some(id) => {
            let order = state
                .orders
                .find_by_id(&id)
                .await
                .map_err(|err| ApplicationError::Persistence(err.to_string()))
                .map_err(|err| error_reply(err, &correlation_id))?;
            match order {
                Some(order) => {
                    let lines = state
                        .orders
                        .lines_for(&id)
                        .await
                        .map_err(|err| ApplicationError::Persistence(err.to_string()))
                        .map_err(|err| error_reply(err, &correlation_id))?;
                    Some(order_view(order, lines))
                }
                None => None,
            }
        }
        None => None,
    };

    let response_headers = sessions::commit(&state, handle)
        .await
        .map_err(|err| error_reply(err, &correlation_id))?;

    Ok((response_headers, Json(CheckoutSuccessResponse { order })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use axum::Json;

    use crate::cart::{add_item, cart_detail, AddItemRequest};
    use crate::testing::{
        sample_product, seed_catalog, test_state, test_state_with_notifier, FailingNotifier,
        RecordingNotifier,
    };

    use super::{checkout, checkout_success, CheckoutRequest};

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

    fn valid_request() -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Ama Mensah".to_string(),
            email: "ama@example.com".to_string(),
            phone: "024 123 4567".to_string(),
            address: "12 Ring Road, Accra".to_string(),
            notes: None,
        }
    }

    async fn filled_cart_cookie(state: &crate::state::AppState) -> HeaderMap {
        seed_catalog(
            state,
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
            Json(AddItemRequest { quantity: 2, override_quantity: false }),
        )
        .await
        .expect("add first");
        let cookie = carry_cookie(&headers);
        add_item(
            State(state.clone()),
            Path("8".to_string()),
            cookie.clone(),
            Json(AddItemRequest { quantity: 1, override_quantity: false }),
        )
        .await
        .expect("add second");
        cookie
    }

    #[tokio::test]
    async fn checkout_places_order_clears_cart_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = test_state_with_notifier(notifier.clone());
        let cookie = filled_cart_cookie(&state).await;

        let (_, Json(response)) =
            checkout(State(state.clone()), cookie.clone(), Json(valid_request()))
                .await
                .expect("checkout succeeds");

        assert!(response.order_id.starts_with("ORD-"));
        assert_eq!(response.total, "44.48");

        let notified = notifier.orders.read().await;
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].1.len(), 2);
        drop(notified);

        let (_, Json(view)) = cart_detail(State(state), cookie).await.expect("detail");
        assert!(view.items.is_empty(), "checkout empties the cart");
    }

    #[tokio::test]
    async fn checkout_with_empty_cart_is_rejected() {
        let state = test_state();

        let error = checkout(State(state), HeaderMap::new(), Json(valid_request()))
            .await
            .expect_err("empty cart rejected");
        assert_eq!(error.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn checkout_with_invalid_draft_is_rejected() {
        let state = test_state();
        let cookie = filled_cart_cookie(&state).await;

        let mut request = valid_request();
        request.email = "no-at-sign".to_string();

        let error = checkout(State(state), cookie, Json(request))
            .await
            .expect_err("invalid draft rejected");
        assert_eq!(error.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn notification_failure_surfaces_and_keeps_the_cart() {
        let state = test_state_with_notifier(Arc::new(FailingNotifier));
        let cookie = filled_cart_cookie(&state).await;

        let error = checkout(State(state.clone()), cookie.clone(), Json(valid_request()))
            .await
            .expect_err("notification failure surfaces");
        assert_eq!(error.0, StatusCode::BAD_GATEWAY);

        let (_, Json(view)) = cart_detail(State(state), cookie).await.expect("detail");
        assert_eq!(view.items.len(), 2, "cart survives a failed notification");
    }

    #[tokio::test]
    async fn success_page_is_one_shot() {
        let state = test_state();
        let cookie = filled_cart_cookie(&state).await;

        checkout(State(state.clone()), cookie.clone(), Json(valid_request()))
            .await
            .expect("checkout succeeds");

        let (_, Json(first)) =
            checkout_success(State(state.clone()), cookie.clone()).await.expect("success page");
        let order = first.order.expect("order is shown once");
        assert_eq!(order.customer_name, "Ama Mensah");
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total, "44.48");

        let (_, Json(second)) =
            checkout_success(State(state), cookie).await.expect("second visit");
        assert!(second.order.is_none(), "order id is consumed on first view");
    }

    #[tokio::test]
    async fn success_page_without_pending_order_returns_null() {
        let state = test_state();

        let (_, Json(response)) =
            checkout_success(State(state), HeaderMap::new()).await.expect("success page");
        assert!(response.order.is_none());
    }
}
