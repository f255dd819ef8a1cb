use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row};

use shopfront_core::cart::ProductLookup;
use shopfront_core::domain::product::{Category, CategorySlug, Product, ProductId};
use shopfront_core::errors::ApplicationError;

use super::{CatalogFilter, CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn category_exists(&self, slug: &CategorySlug) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM category WHERE slug = ?")
            .bind(&slug.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") > 0)
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let slug: String = row.try_get("slug").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category_slug: String =
        row.try_get("category_slug").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let available: i64 =
        row.try_get("available").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let price = Decimal::from_str(&price_str)
        .map_err(|_| RepositoryError::Decode(format!("invalid product price `{price_str}`")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Product {
        id: ProductId(id),
        slug,
        name,
        description,
        price,
        category: CategorySlug(category_slug),
        available: available != 0,
        created_at,
    })
}

const PRODUCT_COLUMNS: &str =
    "id, slug, name, description, price, category_slug, available, created_at";

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_products(&self, filter: CatalogFilter) -> Result<Vec<Product>, RepositoryError> {
        // An unknown category slug drops the filter rather than producing an
        // empty page; the storefront treats it as "show everything".
        let category = match filter.category {
            Some(slug) if self.category_exists(&slug).await? => Some(slug),
            _ => None,
        };

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE available = 1"
        ));
        if let Some(slug) = category {
            builder.push(" AND category_slug = ");
            builder.push_bind(slug.0);
        }
        if let Some(search) = filter.search.filter(|term| !term.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim().to_lowercase());
            builder.push(" AND (LOWER(name) LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR LOWER(description) LIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE slug = ? AND available = 1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_ids(
        &self,
        ids: &[ProductId],
        available_only: bool,
    ) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(&id.0);
        }
        builder.push(")");
        if available_only {
            builder.push(" AND available = 1");
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn find_available(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ? AND available = 1"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query("SELECT slug, name FROM category ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let slug: String =
                    row.try_get("slug").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let name: String =
                    row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Category { slug: CategorySlug(slug), name })
            })
            .collect()
    }

    async fn save_product(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (id, slug, name, description, price, category_slug, available, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 slug = excluded.slug,
                 name = excluded.name,
                 description = excluded.description,
                 price = excluded.price,
                 category_slug = excluded.category_slug,
                 available = excluded.available",
        )
        .bind(&product.id.0)
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(&product.category.0)
        .bind(i64::from(product.available))
        .bind(product.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_category(&self, category: Category) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO category (slug, name) VALUES (?, ?)
             ON CONFLICT(slug) DO UPDATE SET name = excluded.name",
        )
        .bind(&category.slug.0)
        .bind(&category.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductLookup for SqlCatalogRepository {
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
