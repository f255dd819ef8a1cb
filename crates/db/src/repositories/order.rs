use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use uuid::Uuid;

use shopfront_core::domain::order::{Order, OrderDraft, OrderId, OrderLine};
use shopfront_core::domain::product::ProductId;

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn new_order_id() -> OrderId {
    let uuid = Uuid::new_v4().simple().to_string();
    OrderId(format!("ORD-{}", &uuid[..12]))
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_name: String =
        row.try_get("customer_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String = row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone: String = row.try_get("phone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let address: String =
        row.try_get("address").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Order { id: OrderId(id), customer_name, email, phone, address, notes, created_at })
}

fn row_to_line(row: &sqlx::sqlite::SqliteRow) -> Result<OrderLine, RepositoryError> {
    let product_id: String =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_name: String =
        row.try_get("product_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let unit_price_str: String =
        row.try_get("unit_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let unit_price = Decimal::from_str(&unit_price_str).map_err(|_| {
        RepositoryError::Decode(format!("invalid order line price `{unit_price_str}`"))
    })?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| RepositoryError::Decode(format!("invalid order line quantity `{quantity}`")))?;

    Ok(OrderLine { product_id: ProductId(product_id), product_name, quantity, unit_price })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(
        &self,
        draft: OrderDraft,
        lines: Vec<OrderLine>,
    ) -> Result<Order, RepositoryError> {
        let id = new_order_id();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO customer_order (id, customer_name, email, phone, address, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&draft.customer_name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(&draft.notes)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                "INSERT INTO order_line (id, order_id, product_id, product_name, unit_price, quantity, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().simple().to_string())
            .bind(&id.0)
            .bind(&line.product_id.0)
            .bind(&line.product_name)
            .bind(line.unit_price.to_string())
            .bind(i64::from(line.quantity))
            .bind(created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id,
            customer_name: draft.customer_name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            notes: draft.notes,
            created_at,
        })
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_name, email, phone, address, notes, created_at
             FROM customer_order WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_order(r)?)),
            None => Ok(None),
        }
    }

    async fn lines_for(&self, id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_id, product_name, unit_price, quantity
             FROM order_line WHERE order_id = ? ORDER BY product_id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_line).collect()
    }
}
