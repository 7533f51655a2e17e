//! # Customer Repository
//!
//! Customers of one business. `loyalty_points` is read-only here; only the
//! order transaction and its reversal change it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::like_pattern;
use crate::error::{DbError, DbResult};
use stockconnect_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, business_id, name, phone, email, loyalty_points, created_at";

/// Input for a new customer. `phone` is already normalized.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, business_id: i64, customer: &NewCustomer) -> DbResult<Customer> {
        let id = sqlx::query(
            r#"
            INSERT INTO customers (business_id, name, phone, email, loyalty_points, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            "#,
        )
        .bind(business_id)
        .bind(customer.name.trim())
        .bind(&customer.phone)
        .bind(customer.email.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(business_id, customer_id = id, "Customer created");

        self.get(business_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn get(&self, business_id: i64, id: i64) -> DbResult<Option<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers WHERE id = ?1 AND business_id = ?2",
            CUSTOMER_COLUMNS
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Lists customers by name, optionally matching name, phone or email.
    pub async fn list(
        &self,
        business_id: i64,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Customer>> {
        let pattern = search.map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);

        let sql = format!(
            r#"
            SELECT {} FROM customers
            WHERE business_id = ?1
              AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\' OR phone LIKE ?2 ESCAPE '\'
                   OR email LIKE ?2 ESCAPE '\')
            ORDER BY name COLLATE NOCASE, id
            LIMIT ?3 OFFSET ?4
            "#,
            CUSTOMER_COLUMNS
        );

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(business_id)
            .bind(pattern.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    pub async fn update(&self, business_id: i64, id: i64, update: &CustomerUpdate) -> DbResult<Customer> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = COALESCE(?3, name),
                phone = COALESCE(?4, phone),
                email = COALESCE(?5, email)
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.phone.as_deref())
        .bind(update.email.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get(business_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn count(&self, business_id: i64) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE business_id = ?1")
            .bind(business_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
