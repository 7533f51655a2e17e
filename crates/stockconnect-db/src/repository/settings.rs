//! # Settings Repository
//!
//! One row per business, created with column defaults on first read.
//! The order transaction reads loyalty parameters through [`load_loyalty`]
//! on its own connection and never creates the row.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use stockconnect_core::{BusinessSettings, LoyaltySettings, Money};

const SETTINGS_COLUMNS: &str = "business_id, currency, loyalty_points_per_unit, \
     currency_unit_for_points_cents, point_redemption_value_cents, low_stock_notifications, \
     phone, address, tax_rate_bps, receipt_footer, default_sender_id, auto_receipt_sms, updated_at";

/// Partial settings update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub currency: Option<String>,
    pub loyalty_points_per_unit: Option<i64>,
    pub currency_unit_for_points_cents: Option<i64>,
    pub point_redemption_value_cents: Option<i64>,
    pub low_stock_notifications: Option<bool>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_rate_bps: Option<i64>,
    pub receipt_footer: Option<String>,
    pub default_sender_id: Option<String>,
    pub auto_receipt_sms: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Returns the business's settings, inserting the defaults row if absent.
    pub async fn get_or_create(&self, business_id: i64) -> DbResult<BusinessSettings> {
        sqlx::query(
            "INSERT INTO settings (business_id, updated_at) VALUES (?1, ?2) \
             ON CONFLICT(business_id) DO NOTHING",
        )
        .bind(business_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.find(business_id)
            .await?
            .ok_or_else(|| DbError::not_found("Settings", business_id))
    }

    /// Returns the settings row without creating it.
    pub async fn find(&self, business_id: i64) -> DbResult<Option<BusinessSettings>> {
        let sql = format!("SELECT {} FROM settings WHERE business_id = ?1", SETTINGS_COLUMNS);

        let settings = sqlx::query_as::<_, BusinessSettings>(&sql)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(settings)
    }

    pub async fn update(&self, business_id: i64, update: &SettingsUpdate) -> DbResult<BusinessSettings> {
        self.get_or_create(business_id).await?;

        sqlx::query(
            r#"
            UPDATE settings SET
                currency = COALESCE(?2, currency),
                loyalty_points_per_unit = COALESCE(?3, loyalty_points_per_unit),
                currency_unit_for_points_cents = COALESCE(?4, currency_unit_for_points_cents),
                point_redemption_value_cents = COALESCE(?5, point_redemption_value_cents),
                low_stock_notifications = COALESCE(?6, low_stock_notifications),
                phone = COALESCE(?7, phone),
                address = COALESCE(?8, address),
                tax_rate_bps = COALESCE(?9, tax_rate_bps),
                receipt_footer = COALESCE(?10, receipt_footer),
                default_sender_id = COALESCE(?11, default_sender_id),
                auto_receipt_sms = COALESCE(?12, auto_receipt_sms),
                updated_at = ?13
            WHERE business_id = ?1
            "#,
        )
        .bind(business_id)
        .bind(update.currency.as_deref())
        .bind(update.loyalty_points_per_unit)
        .bind(update.currency_unit_for_points_cents)
        .bind(update.point_redemption_value_cents)
        .bind(update.low_stock_notifications)
        .bind(update.phone.as_deref())
        .bind(update.address.as_deref())
        .bind(update.tax_rate_bps)
        .bind(update.receipt_footer.as_deref())
        .bind(update.default_sender_id.as_deref())
        .bind(update.auto_receipt_sms)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(business_id, "Settings updated");

        self.get_or_create(business_id).await
    }
}

/// Loyalty parameters read inside an open transaction.
///
/// `None` when the business has never saved settings; accrual then uses
/// the built-in defaults.
pub(crate) async fn load_loyalty(
    conn: &mut SqliteConnection,
    business_id: i64,
) -> DbResult<Option<LoyaltySettings>> {
    let row: Option<(i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT loyalty_points_per_unit, currency_unit_for_points_cents, point_redemption_value_cents
        FROM settings
        WHERE business_id = ?1
        "#,
    )
    .bind(business_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(points_per_unit, unit_cents, point_value_cents)| LoyaltySettings {
        points_per_unit,
        unit_amount: Money::from_cents(unit_cents),
        point_value: Money::from_cents(point_value_cents),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_business, test_db};

    #[tokio::test]
    async fn test_defaults_created_on_first_read() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;

        assert!(db.settings().find(business).await.unwrap().is_none());

        let settings = db.settings().get_or_create(business).await.unwrap();
        assert_eq!(settings.loyalty_points_per_unit, 1);
        assert_eq!(settings.currency_unit_for_points_cents, 10_000);
        assert!(settings.low_stock_notifications);
        assert!(!settings.auto_receipt_sms);

        // Idempotent
        db.settings().get_or_create(business).await.unwrap();
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = test_db().await;
        let business = seed_business(&db, "Shop").await;

        let settings = db
            .settings()
            .update(
                business,
                &SettingsUpdate {
                    loyalty_points_per_unit: Some(2),
                    low_stock_notifications: Some(false),
                    ..SettingsUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(settings.loyalty_points_per_unit, 2);
        assert!(!settings.low_stock_notifications);
        assert_eq!(settings.currency, "₦");

        let mut conn = db.pool().acquire().await.unwrap();
        let loyalty = load_loyalty(&mut conn, business).await.unwrap().unwrap();
        assert_eq!(loyalty.points_per_unit, 2);
        assert!(load_loyalty(&mut conn, business + 1).await.unwrap().is_none());
    }
}
