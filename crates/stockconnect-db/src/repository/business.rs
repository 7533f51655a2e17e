//! # Business Repository
//!
//! Tenants. Businesses are created by the seed tool or an operator; the API
//! only reads them to resolve the caller's business.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use stockconnect_core::Business;

#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    pub async fn create(&self, name: &str, phone: Option<&str>) -> DbResult<Business> {
        let now = Utc::now();

        let id = sqlx::query("INSERT INTO businesses (name, phone, created_at) VALUES (?1, ?2, ?3)")
            .bind(name)
            .bind(phone)
            .bind(now)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        info!(business_id = id, name, "Business created");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", id))
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Business>> {
        let business = sqlx::query_as::<_, Business>(
            "SELECT id, name, phone, created_at FROM businesses WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(business)
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM businesses WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::test_db;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = test_db().await;

        let business = db.businesses().create("Ada Provisions", Some("+2348030000000")).await.unwrap();
        assert_eq!(business.name, "Ada Provisions");

        assert!(db.businesses().exists(business.id).await.unwrap());
        assert!(!db.businesses().exists(business.id + 1).await.unwrap());
        assert!(db.businesses().get(404).await.unwrap().is_none());
    }
}
