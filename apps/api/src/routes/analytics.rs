//! Dashboard summary figures.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;

use stockconnect_core::Money;

use crate::business::BusinessContext;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/analytics/summary", get(summary))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub product_count: i64,
    pub low_stock_count: i64,
    pub customer_count: i64,
    pub order_count: i64,
    /// Sum of totals over orders that were not cancelled.
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

async fn summary(State(state): State<AppState>, business: BusinessContext) -> ApiResult<Json<SummaryResponse>> {
    let products = state.db.products();
    let totals = state.db.orders().totals(business.id).await?;

    Ok(Json(SummaryResponse {
        product_count: products.count(business.id).await?,
        low_stock_count: products.count_low_stock(business.id).await?,
        customer_count: state.db.customers().count(business.id).await?,
        order_count: totals.order_count,
        revenue: Money::from_cents(totals.revenue_cents).to_decimal(),
    }))
}
