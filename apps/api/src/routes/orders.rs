//! # Order Routes
//!
//! Checkout, order history and the status machine. The heavy lifting is in
//! [`OrderService`](crate::services::OrderService).

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use stockconnect_core::validation::page_limit;
use stockconnect_core::{Order, OrderStatus, OrderWithItems};
use stockconnect_db::OrderListQuery;

use crate::business::BusinessContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::Page;
use crate::services::CreateOrderRequest;
use crate::state::AppState;

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/status", patch(update_status))
        .route("/api/orders/{id}/cancel", post(cancel_order))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub id: i64,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: OrderStatus,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_order(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> ApiResult<Json<CreateOrderResponse>> {
    debug!(business_id = business.id, lines = request.items.len(), "create_order");

    let created = state.orders().create_order(business.id, &request).await?;

    Ok(Json(CreateOrderResponse {
        id: created.order_id,
        success: true,
    }))
}

async fn list_orders(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiQuery(query): ApiQuery<OrdersQuery>,
) -> ApiResult<Json<Page<Order>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(OrderStatus::from_str)
        .transpose()?;

    let page = state
        .db
        .orders()
        .list(
            business.id,
            &OrderListQuery {
                status,
                customer_id: None,
                limit: page_limit(query.limit, DEFAULT_PAGE, MAX_PAGE),
                offset: query.offset.unwrap_or(0).max(0),
            },
        )
        .await?;

    Ok(Json(Page {
        data: page.data,
        total: page.total,
    }))
}

async fn get_order(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderWithItems>> {
    state
        .db
        .orders()
        .get_with_items(business.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Order {} not found", id)))
}

async fn update_status(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let next = OrderStatus::from_str(&request.status)?;
    debug!(order_id = id, business_id = business.id, status = %next, "update_status");

    state.orders().update_status(business.id, id, next).await?;

    Ok(Json(StatusResponse {
        success: true,
        status: next,
    }))
}

async fn cancel_order(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<StatusResponse>> {
    debug!(order_id = id, business_id = business.id, "cancel_order");

    state.orders().cancel_with_reversal(business.id, id).await?;

    Ok(Json(StatusResponse {
        success: true,
        status: OrderStatus::Cancelled,
    }))
}
