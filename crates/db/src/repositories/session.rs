use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use shopfront_core::session::{Session, SessionId};

use super::{RepositoryError, SessionStore};
use crate::DbPool;

pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionStore for SqlSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query("SELECT data_json FROM session WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String =
            row.try_get("data_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let values: BTreeMap<String, Value> = serde_json::from_str(&raw)
            .map_err(|e| RepositoryError::Decode(format!("invalid session payload: {e}")))?;

        Ok(Some(Session::from_values(values)))
    }

    async fn save(&self, id: &SessionId, session: &Session) -> Result<(), RepositoryError> {
        let data_json = serde_json::to_string(session.values())
            .map_err(|e| RepositoryError::Decode(format!("unserializable session: {e}")))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO session (id, data_json, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 data_json = excluded.data_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&id.0)
        .bind(data_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM session WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use shopfront_core::session::{Session, SessionId};

    use super::SqlSessionStore;
    use crate::repositories::SessionStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool);
        let id = SessionId::generate();

        let mut session = Session::new();
        session.insert("cart", json!({"7": {"quantity": 2, "price": "19.99"}}));
        store.save(&id, &session).await.expect("save");

        let loaded = store.load(&id).await.expect("load").expect("should exist");
        assert!(!loaded.is_modified(), "rehydrated session starts unmodified");
        assert_eq!(loaded.get("cart"), session.get("cart"));
    }

    #[tokio::test]
    async fn save_upserts_latest_values() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool);
        let id = SessionId::generate();

        let mut session = Session::new();
        session.insert("cart", json!({"7": {"quantity": 1, "price": "19.99"}}));
        store.save(&id, &session).await.expect("save");

        session.insert("order_id", json!("ORD-abc"));
        store.save(&id, &session).await.expect("upsert");

        let loaded = store.load(&id).await.expect("load").expect("should exist");
        assert_eq!(loaded.get("order_id"), Some(&json!("ORD-abc")));
    }

    #[tokio::test]
    async fn load_of_unknown_session_is_none() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool);

        let loaded = store.load(&SessionId::generate()).await.expect("load");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool);
        let id = SessionId::generate();

        store.save(&id, &Session::new()).await.expect("save");
        store.delete(&id).await.expect("delete");

        assert!(store.load(&id).await.expect("load").is_none());
    }
}
