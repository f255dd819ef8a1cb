use async_trait::async_trait;
use thiserror::Error;

use shopfront_core::domain::order::{Order, OrderDraft, OrderId, OrderLine};
use shopfront_core::domain::product::{Category, CategorySlug, Product, ProductId};
use shopfront_core::session::{Session, SessionId};

pub mod catalog;
pub mod memory;
pub mod order;
pub mod session;

pub use catalog::SqlCatalogRepository;
pub use memory::{InMemoryCatalog, InMemoryOrderRepository, InMemorySessionStore};
pub use order::SqlOrderRepository;
pub use session::SqlSessionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Optional narrowing criteria for catalog listings.
#[derive(Clone, Debug, Default)]
pub struct CatalogFilter {
    pub search: Option<String>,
    pub category: Option<CategorySlug>,
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Available products, newest first, narrowed by the filter.
    async fn list_products(&self, filter: CatalogFilter) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError>;

    async fn find_by_ids(
        &self,
        ids: &[ProductId],
        available_only: bool,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn find_available(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn save_product(&self, product: Product) -> Result<(), RepositoryError>;

    async fn save_category(&self, category: Category) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a validated draft and its lines atomically, assigning the id.
    async fn create(
        &self,
        draft: OrderDraft,
        lines: Vec<OrderLine>,
    ) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn lines_for(&self, id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError>;

    async fn save(&self, id: &SessionId, session: &Session) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError>;
}
