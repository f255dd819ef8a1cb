use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use shopfront_core::cart::ProductLookup;
use shopfront_core::domain::order::{Order, OrderDraft, OrderId, OrderLine};
use shopfront_core::domain::product::{Category, CategorySlug, Product, ProductId};
use shopfront_core::errors::ApplicationError;
use shopfront_core::session::{Session, SessionId};

use super::{
    CatalogFilter, CatalogRepository, OrderRepository, RepositoryError, SessionStore,
};

/// In-memory stand-ins for handler and service tests. Same observable
/// behavior as the SQL repositories, no pool required.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, Product>>,
    categories: RwLock<HashMap<String, Category>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn list_products(&self, filter: CatalogFilter) -> Result<Vec<Product>, RepositoryError> {
        let categories = self.categories.read().await;
        let category = filter.category.filter(|slug| categories.contains_key(&slug.0));
        drop(categories);

        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        let products = self.products.read().await;
        let mut listed: Vec<Product> = products
            .values()
            .filter(|product| product.available)
            .filter(|product| category.as_ref().map_or(true, |slug| product.category == *slug))
            .filter(|product| {
                search.as_ref().map_or(true, |term| {
                    product.name.to_lowercase().contains(term)
                        || product.description.to_lowercase().contains(term)
                })
            })
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(listed)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().find(|product| product.slug == slug && product.available).cloned())
    }

    async fn find_by_ids(
        &self,
        ids: &[ProductId],
        available_only: bool,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(&id.0))
            .filter(|product| !available_only || product.available)
            .cloned()
            .collect())
    }

    async fn find_available(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).filter(|product| product.available).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        let mut listed: Vec<Category> = categories.values().cloned().collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    async fn save_product(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn save_category(&self, category: Category) -> Result<(), RepositoryError> {
        let mut categories = self.categories.write().await;
        categories.insert(category.slug.0.clone(), category);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductLookup for InMemoryCatalog {
    async fn find_by_ids(
        &self,
        ids: &[ProductId],
        available_only: bool,
    ) -> Result<Vec<Product>, ApplicationError> {
        CatalogRepository::find_by_ids(self, ids, available_only)
            .await
            .map_err(|err| ApplicationError::Persistence(err.to_string()))
    }

    async fn find_available(&self, id: &ProductId) -> Result<Option<Product>, ApplicationError> {
        CatalogRepository::find_available(self, id)
            .await
            .map_err(|err| ApplicationError::Persistence(err.to_string()))
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
    lines: RwLock<HashMap<String, Vec<OrderLine>>>,
    sequence: AtomicU64,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(
        &self,
        draft: OrderDraft,
        lines: Vec<OrderLine>,
    ) -> Result<Order, RepositoryError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let order = Order {
            id: OrderId(format!("ORD-{sequence:012}")),
            customer_name: draft.customer_name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            notes: draft.notes,
            created_at: Utc::now(),
        };

        self.lines.write().await.insert(order.id.0.clone(), lines);
        self.orders.write().await.insert(order.id.0.clone(), order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn lines_for(&self, id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let lines = self.lines.read().await;
        Ok(lines.get(&id.0).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned().map(Session::from_values))
    }

    async fn save(&self, id: &SessionId, session: &Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.0.clone(), session.values().clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use shopfront_core::domain::order::{OrderDraft, OrderLine};
    use shopfront_core::domain::product::{Category, CategorySlug, Product, ProductId};
    use shopfront_core::session::{Session, SessionId};

    use crate::repositories::{
        CatalogFilter, CatalogRepository, InMemoryCatalog, InMemoryOrderRepository,
        InMemorySessionStore, OrderRepository, SessionStore,
    };

    fn product(id: &str, slug: &str, available: bool) -> Product {
        Product {
            id: ProductId(id.to_string()),
            slug: slug.to_string(),
            name: slug.replace('-', " "),
            description: String::new(),
            price: Decimal::new(1999, 2),
            category: CategorySlug("coffee".to_string()),
            available,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_catalog_round_trip_and_listing() {
        let catalog = InMemoryCatalog::default();
        catalog
            .save_category(Category {
                slug: CategorySlug("coffee".to_string()),
                name: "Coffee".to_string(),
            })
            .await
            .expect("save category");
        catalog.save_product(product("1", "espresso-beans", true)).await.expect("save");
        catalog.save_product(product("2", "retired-grinder", false)).await.expect("save");

        let listed = catalog.list_products(CatalogFilter::default()).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "espresso-beans");

        let by_slug = catalog.find_by_slug("espresso-beans").await.expect("lookup");
        assert!(by_slug.is_some());
        assert!(catalog.find_by_slug("retired-grinder").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn in_memory_order_repo_assigns_sequential_ids() {
        let repo = InMemoryOrderRepository::default();
        let draft = OrderDraft {
            customer_name: "Ama Mensah".to_string(),
            email: "ama@example.com".to_string(),
            phone: "024 123 4567".to_string(),
            address: "12 Ring Road, Accra".to_string(),
            notes: None,
        };
        let lines = vec![OrderLine {
            product_id: ProductId("1".to_string()),
            product_name: "Espresso Beans".to_string(),
            quantity: 2,
            unit_price: Decimal::new(1999, 2),
        }];

        let first = repo.create(draft.clone(), lines.clone()).await.expect("create");
        let second = repo.create(draft, Vec::new()).await.expect("create");
        assert_ne!(first.id, second.id);

        let stored = repo.lines_for(&first.id).await.expect("lines");
        assert_eq!(stored, lines);
    }

    #[tokio::test]
    async fn in_memory_session_store_round_trip() {
        let store = InMemorySessionStore::default();
        let id = SessionId::generate();

        let mut session = Session::new();
        session.insert("cart", json!({"1": {"quantity": 2, "price": "19.99"}}));
        store.save(&id, &session).await.expect("save");

        let loaded = store.load(&id).await.expect("load").expect("should exist");
        assert_eq!(loaded.get("cart"), session.get("cart"));

        store.delete(&id).await.expect("delete");
        assert!(store.load(&id).await.expect("load").is_none());
    }
}
