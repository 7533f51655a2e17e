//! Settings routes. The row is created with defaults on first read.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;

use stockconnect_core::validation::{
    validate_non_negative, validate_points_per_unit, validate_positive_amount, validate_tax_rate_bps,
};
use stockconnect_core::BusinessSettings;
use stockconnect_db::SettingsUpdate;

use crate::business::BusinessContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::services::to_money;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).patch(update_settings))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub currency: Option<String>,
    pub loyalty_points_per_unit: Option<i64>,
    /// Spend that earns `loyaltyPointsPerUnit` points.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub currency_unit_for_points: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub point_redemption_value: Option<Decimal>,
    pub low_stock_notifications: Option<bool>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_rate_bps: Option<i64>,
    pub receipt_footer: Option<String>,
    pub default_sender_id: Option<String>,
    pub auto_receipt_sms: Option<bool>,
}

impl SettingsRequest {
    fn into_update(self) -> ApiResult<SettingsUpdate> {
        if let Some(points) = self.loyalty_points_per_unit {
            validate_points_per_unit(points)?;
        }
        if let Some(bps) = self.tax_rate_bps {
            validate_tax_rate_bps(bps)?;
        }

        let currency_unit_for_points_cents = match self.currency_unit_for_points {
            Some(unit) => {
                let unit = to_money("currencyUnitForPoints", unit)?;
                validate_positive_amount("currencyUnitForPoints", unit)?;
                Some(unit.cents())
            }
            None => None,
        };
        let point_redemption_value_cents = match self.point_redemption_value {
            Some(value) => {
                let value = to_money("pointRedemptionValue", value)?;
                validate_non_negative("pointRedemptionValue", value.cents())?;
                Some(value.cents())
            }
            None => None,
        };

        let currency = match self.currency.as_deref().map(str::trim) {
            Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(code.to_ascii_uppercase())
            }
            Some(_) => return Err(ApiError::validation("currency must be a three-letter code")),
            None => None,
        };

        Ok(SettingsUpdate {
            currency,
            loyalty_points_per_unit: self.loyalty_points_per_unit,
            currency_unit_for_points_cents,
            point_redemption_value_cents,
            low_stock_notifications: self.low_stock_notifications,
            phone: self.phone,
            address: self.address,
            tax_rate_bps: self.tax_rate_bps,
            receipt_footer: self.receipt_footer,
            default_sender_id: self.default_sender_id,
            auto_receipt_sms: self.auto_receipt_sms,
        })
    }
}

async fn get_settings(
    State(state): State<AppState>,
    business: BusinessContext,
) -> ApiResult<Json<BusinessSettings>> {
    Ok(Json(state.db.settings().get_or_create(business.id).await?))
}

async fn update_settings(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiJson(request): ApiJson<SettingsRequest>,
) -> ApiResult<Json<BusinessSettings>> {
    let update = request.into_update()?;
    Ok(Json(state.db.settings().update(business.id, &update).await?))
}
