//! # Product Repository
//!
//! Catalogue operations for one business.
//!
//! ## Quantity Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create()          quantity = initial_quantity = seed level             │
//! │  update()          every field EXCEPT quantity                          │
//! │  update_threshold  reorder_threshold only                               │
//! │                                                                         │
//! │  quantity itself moves only through stock::apply_stock_delta, so the   │
//! │  ledger always explains it.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Search is a plain `LIKE` over name, category and barcode; a business's
//! catalogue is small enough that an FTS table would be overhead.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::like_pattern;
use crate::error::{DbError, DbResult};
use stockconnect_core::{Product, DEFAULT_REORDER_THRESHOLD};

const PRODUCT_COLUMNS: &str = "id, business_id, name, category, description, price_cents, \
     cost_cents, quantity, initial_quantity, reorder_threshold, supplier, supplier_phone, \
     barcode, image_url, created_at, updated_at";

/// Input for a new product. Prices are already validated minor units.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    /// Seed level; becomes both `quantity` and `initial_quantity`.
    pub quantity: i64,
    /// `None` uses the default threshold of 5.
    pub reorder_threshold: Option<i64>,
    pub supplier: Option<String>,
    pub supplier_phone: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub reorder_threshold: Option<i64>,
    pub supplier: Option<String>,
    pub supplier_phone: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProductListQuery {
    fn default() -> Self {
        ProductListQuery {
            search: None,
            category: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// One page of products plus the unpaged match count.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub data: Vec<Product>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the stored row
    /// * `Err(DbError::UniqueViolation)` - barcode already used in this business
    pub async fn create(&self, business_id: i64, product: &NewProduct) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_product(&mut conn, business_id, product, Utc::now()).await?;
        drop(conn);

        info!(business_id, product_id = id, name = %product.name, "Product created");

        self.get(business_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Inserts many products in one transaction; any failure stores none.
    pub async fn create_many(&self, business_id: i64, products: &[NewProduct]) -> DbResult<Vec<i64>> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let now = Utc::now();

        let mut ids = Vec::with_capacity(products.len());
        for product in products {
            ids.push(insert_product(&mut tx, business_id, product, now).await?);
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(business_id, count = ids.len(), "Products imported");
        Ok(ids)
    }

    /// Gets a product owned by `business_id`.
    pub async fn get(&self, business_id: i64, id: i64) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND business_id = ?2",
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product regardless of owner. Used by background work that
    /// already carries a trusted id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn find_by_barcode(&self, business_id: i64, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE business_id = ?1 AND barcode = ?2",
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(business_id)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists products by name with optional search and category filters.
    pub async fn list(&self, business_id: i64, query: &ProductListQuery) -> DbResult<ProductPage> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let category = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty());

        debug!(business_id, search = ?pattern, category = ?category, "Listing products");

        let filter = r#"
            WHERE business_id = ?1
              AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\' OR category LIKE ?2 ESCAPE '\'
                   OR barcode LIKE ?2 ESCAPE '\')
              AND (?3 IS NULL OR category = ?3)
        "#;

        let sql = format!(
            "SELECT {} FROM products {} ORDER BY name COLLATE NOCASE, id LIMIT ?4 OFFSET ?5",
            PRODUCT_COLUMNS, filter
        );
        let data = sqlx::query_as::<_, Product>(&sql)
            .bind(business_id)
            .bind(pattern.as_deref())
            .bind(category)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM products {}", filter);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(business_id)
            .bind(pattern.as_deref())
            .bind(category)
            .fetch_one(&self.pool)
            .await?;

        Ok(ProductPage { data, total })
    }

    /// Products at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self, business_id: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE business_id = ?1 AND quantity <= reorder_threshold \
             ORDER BY quantity, name",
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(business_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Applies a partial update. Quantity is not touched here.
    pub async fn update(&self, business_id: i64, id: i64, update: &ProductUpdate) -> DbResult<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?3, name),
                category = COALESCE(?4, category),
                description = COALESCE(?5, description),
                price_cents = COALESCE(?6, price_cents),
                cost_cents = COALESCE(?7, cost_cents),
                reorder_threshold = COALESCE(?8, reorder_threshold),
                supplier = COALESCE(?9, supplier),
                supplier_phone = COALESCE(?10, supplier_phone),
                barcode = COALESCE(?11, barcode),
                image_url = COALESCE(?12, image_url),
                updated_at = ?13
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(update.name.as_deref())
        .bind(update.category.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price_cents)
        .bind(update.cost_cents)
        .bind(update.reorder_threshold)
        .bind(update.supplier.as_deref())
        .bind(update.supplier_phone.as_deref())
        .bind(update.barcode.as_deref())
        .bind(update.image_url.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| barcode_conflict(e, update.barcode.as_deref()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get(business_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn update_threshold(&self, business_id: i64, id: i64, threshold: i64) -> DbResult<Product> {
        self.update(
            business_id,
            id,
            &ProductUpdate {
                reorder_threshold: Some(threshold),
                ..ProductUpdate::default()
            },
        )
        .await
    }

    /// Deletes a product and its movement history.
    ///
    /// Products that appear on any order are kept: deleting them would
    /// orphan order lines.
    pub async fn delete(&self, business_id: i64, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        // Write first so the transaction holds the write lock from the start
        sqlx::query(
            r#"
            DELETE FROM stock_movements
            WHERE product_id = ?1
              AND EXISTS (SELECT 1 FROM products WHERE id = ?1 AND business_id = ?2)
              AND NOT EXISTS (SELECT 1 FROM order_items WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM products
            WHERE id = ?1 AND business_id = ?2
              AND NOT EXISTS (SELECT 1 FROM order_items WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .bind(business_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            let owned: Option<i64> =
                sqlx::query_scalar("SELECT id FROM products WHERE id = ?1 AND business_id = ?2")
                    .bind(id)
                    .bind(business_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match owned {
                Some(_) => DbError::ForeignKeyViolation {
                    message: format!("Product {} has order history and cannot be deleted", id),
                },
                None => DbError::not_found("Product", id),
            });
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(business_id, product_id = id, "Product deleted");
        Ok(())
    }

    /// Returns the subset of `ids` owned by `business_id`.
    pub async fn owned_ids(&self, business_id: i64, ids: &[i64]) -> DbResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM products WHERE business_id = ");
        builder.push_bind(business_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let owned = builder
            .build_query_scalar::<i64>()
            .fetch_all(&self.pool)
            .await?;

        Ok(owned)
    }

    pub async fn count(&self, business_id: i64) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE business_id = ?1")
            .bind(business_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn count_low_stock(&self, business_id: i64) -> DbResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE business_id = ?1 AND quantity <= reorder_threshold",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

async fn insert_product(
    conn: &mut SqliteConnection,
    business_id: i64,
    product: &NewProduct,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let barcode = product
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let id = sqlx::query(
        r#"
        INSERT INTO products (
            business_id, name, category, description, price_cents, cost_cents,
            quantity, initial_quantity, reorder_threshold,
            supplier, supplier_phone, barcode, image_url, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
        "#,
    )
    .bind(business_id)
    .bind(product.name.trim())
    .bind(product.category.as_deref())
    .bind(product.description.as_deref())
    .bind(product.price_cents)
    .bind(product.cost_cents)
    .bind(product.quantity)
    .bind(product.reorder_threshold.unwrap_or(DEFAULT_REORDER_THRESHOLD))
    .bind(product.supplier.as_deref())
    .bind(product.supplier_phone.as_deref())
    .bind(barcode)
    .bind(product.image_url.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| barcode_conflict(e, barcode))?
    .last_insert_rowid();

    Ok(id)
}

fn barcode_conflict(err: sqlx::Error, barcode: Option<&str>) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("barcode", barcode.unwrap_or_default()),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_business, seed_product, test_db};
    use stockconnect_core::{PaymentMethod, StockPolicy, StockReason};

    #[tokio::test]
    async fn test_create_seeds_initial_quantity() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;

        let product = db
            .products()
            .create(
                business,
                &NewProduct {
                    name: "  Peak Milk Tin ".to_string(),
                    price_cents: 45_000,
                    quantity: 24,
                    barcode: Some("6151100040126".to_string()),
                    ..NewProduct::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(product.name, "Peak Milk Tin");
        assert_eq!(product.quantity, 24);
        assert_eq!(product.initial_quantity, 24);
        assert_eq!(product.reorder_threshold, DEFAULT_REORDER_THRESHOLD);

        let by_code = db
            .products()
            .find_by_barcode(business, "6151100040126")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_code.id, product.id);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected_per_business() {
        let db = test_db().await;
        let mine = seed_business(&db, "Mine").await;
        let theirs = seed_business(&db, "Theirs").await;
        let item = NewProduct {
            name: "Indomie".to_string(),
            price_cents: 20_000,
            barcode: Some("123".to_string()),
            ..NewProduct::default()
        };

        db.products().create(mine, &item).await.unwrap();
        let err = db.products().create(mine, &item).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Same barcode in another business is fine
        db.products().create(theirs, &item).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_search_and_paging() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;
        for name in ["Rice 5kg", "Rice 10kg", "Beans 1kg", "50% Off Soap"] {
            seed_product(&db, business, name, 10).await;
        }

        let page = db
            .products()
            .list(
                business,
                &ProductListQuery {
                    search: Some("rice".to_string()),
                    limit: 1,
                    ..ProductListQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data.len(), 1);

        let literal = db
            .products()
            .list(
                business,
                &ProductListQuery {
                    search: Some("50%".to_string()),
                    ..ProductListQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(literal.total, 1);
        assert_eq!(literal.data[0].name, "50% Off Soap");
    }

    #[tokio::test]
    async fn test_update_leaves_quantity_alone() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;
        let product = seed_product(&db, business, "Sugar", 7).await;

        let updated = db
            .products()
            .update(
                business,
                product.id,
                &ProductUpdate {
                    price_cents: Some(60_000),
                    supplier_phone: Some("+2348020000000".to_string()),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price_cents, 60_000);
        assert_eq!(updated.quantity, 7);
        assert_eq!(updated.name, "Sugar");

        let other = seed_business(&db, "Other").await;
        let err = db
            .products()
            .update(other, product.id, &ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_low_stock_and_threshold() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;
        let low = seed_product(&db, business, "Salt", 3).await;
        let fine = seed_product(&db, business, "Pepper", 30).await;

        let listed = db.products().low_stock(business).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, low.id);

        db.products().update_threshold(business, fine.id, 40).await.unwrap();
        assert_eq!(db.products().count_low_stock(business).await.unwrap(), 2);
        assert_eq!(db.products().count(business).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_owned_ids_filters_foreign_products() {
        let db = test_db().await;
        let mine = seed_business(&db, "Mine").await;
        let theirs = seed_business(&db, "Theirs").await;
        let a = seed_product(&db, mine, "A", 1).await;
        let b = seed_product(&db, theirs, "B", 1).await;

        let owned = db.products().owned_ids(mine, &[a.id, b.id, 999]).await.unwrap();
        assert_eq!(owned, vec![a.id]);
        assert!(db.products().owned_ids(mine, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_and_without_history() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;
        let loose = seed_product(&db, business, "Loose", 5).await;
        let sold = seed_product(&db, business, "Sold", 5).await;

        db.stock()
            .adjust_stock(loose.id, 2, StockReason::Restock, StockPolicy::permissive())
            .await
            .unwrap();
        db.products().delete(business, loose.id).await.unwrap();
        assert!(db.products().get(business, loose.id).await.unwrap().is_none());

        let order = crate::NewOrder {
            business_id: business,
            customer_id: None,
            total_cents: 50_000,
            payment_method: PaymentMethod::Cash,
            lines: vec![crate::NewOrderLine {
                product_id: sold.id,
                quantity: 1,
                unit_price_cents: 50_000,
            }],
        };
        db.orders().create_order(&order, StockPolicy::permissive()).await.unwrap();

        let err = db.products().delete(business, sold.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(db.products().delete(business, 12345).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_many_is_all_or_nothing() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;
        let rows = vec![
            NewProduct {
                name: "One".to_string(),
                barcode: Some("X".to_string()),
                ..NewProduct::default()
            },
            NewProduct {
                name: "Two".to_string(),
                barcode: Some("X".to_string()),
                ..NewProduct::default()
            },
        ];

        assert!(db.products().create_many(business, &rows).await.is_err());
        assert_eq!(db.products().count(business).await.unwrap(), 0);

        let ids = db.products().create_many(business, &rows[..1]).await.unwrap();
        assert_eq!(ids.len(), 1);
    }
}
