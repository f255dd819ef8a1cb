use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use shopfront_core::config::StoreConfig;
use shopfront_core::domain::order::{Order, OrderLine};
use shopfront_core::domain::product::{Category, CategorySlug, Product, ProductId};
use shopfront_db::repositories::{
    CatalogRepository, InMemoryCatalog, InMemoryOrderRepository, InMemorySessionStore,
};
use shopfront_mail::transport::NoopTransport;
use shopfront_mail::{Notifier, NotifyError, OrderMailer, TransportError};

use crate::state::AppState;

pub fn test_store_config() -> StoreConfig {
    StoreConfig {
        name: "Shopfront".to_string(),
        currency: "USD".to_string(),
        cart_session_key: "cart".to_string(),
        session_cookie: "shopfront_session".to_string(),
    }
}

pub fn test_state() -> AppState {
    let mailer = OrderMailer::new(
        Arc::new(NoopTransport),
        "Shopfront".to_string(),
        "USD".to_string(),
        "shop@shopfront.example".to_string(),
    )
    .expect("mailer builds");
    test_state_with_notifier(Arc::new(mailer))
}

pub fn test_state_with_notifier(notifier: Arc<dyn Notifier>) -> AppState {
    let catalog = Arc::new(InMemoryCatalog::default());
    AppState {
        catalog: catalog.clone(),
        lookup: catalog,
        orders: Arc::new(InMemoryOrderRepository::default()),
        sessions: Arc::new(InMemorySessionStore::default()),
        notifier,
        store: test_store_config(),
    }
}

pub fn sample_product(id: &str, slug: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId(id.to_string()),
        slug: slug.to_string(),
        name: slug.replace('-', " "),
        description: String::new(),
        price: Decimal::new(price_cents, 2),
        category: CategorySlug("coffee".to_string()),
        available: true,
        created_at: Utc::now(),
    }
}

pub async fn seed_catalog(state: &AppState, products: Vec<Product>) {
    state
        .catalog
        .save_category(Category {
            slug: CategorySlug("coffee".to_string()),
            name: "Coffee".to_string(),
        })
        .await
        .expect("save category");
    for product in products {
        state.catalog.save_product(product).await.expect("save product");
    }
}

/// Notifier fake that records every call.
#[derive(Default)]
pub struct RecordingNotifier {
    pub orders: RwLock<Vec<(Order, Vec<OrderLine>)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_placed(&self, order: &Order, lines: &[OrderLine]) -> Result<(), NotifyError> {
        self.orders.write().await.push((order.clone(), lines.to_vec()));
        Ok(())
    }
}

/// Notifier fake that always fails, for checkout error-path tests.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn order_placed(&self, _order: &Order, _lines: &[OrderLine]) -> Result<(), NotifyError> {
        Err(NotifyError::Transport(TransportError::BadStatus(503)))
    }
}
