//! # Product Routes
//!
//! Catalogue management plus the stock ledger views.
//!
//! ```text
//! POST   /api/products                 create (quantity seeds the ledger)
//! GET    /api/products                 list  ?search=&category=&limit=&offset=
//! GET    /api/products/low-stock       quantity <= reorder_threshold
//! GET    /api/products/movements       ledger ?productId=&limit=
//! POST   /api/products/bulk-import     { products: [...] }
//! GET    /api/products/barcode/{code}
//! GET    /api/products/{id}
//! PUT    /api/products/{id}            every attribute except quantity
//! DELETE /api/products/{id}            409 once sold
//! PATCH  /api/products/{id}/threshold  { threshold }
//! POST   /api/products/{id}/stock      { quantity, reason? }
//! GET    /api/products/{id}/audit
//! ```

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use stockconnect_core::validation::{
    page_limit, validate_barcode, validate_contact_phone, validate_name, validate_non_negative,
    validate_price, validate_search_query,
};
use stockconnect_core::{Product, StockMovement, StockReason, DEFAULT_REORDER_THRESHOLD};
use stockconnect_db::{NewProduct, ProductListQuery, ProductUpdate};

use crate::business::BusinessContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::{Page, Success};
use crate::services::to_money;
use crate::state::AppState;

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;
const MAX_MOVEMENTS: i64 = 500;
const MAX_IMPORT_ROWS: usize = 1000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", post(create_product).get(list_products))
        .route("/api/products/low-stock", get(low_stock))
        .route("/api/products/movements", get(movements))
        .route("/api/products/bulk-import", post(bulk_import))
        .route("/api/products/barcode/{code}", get(by_barcode))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/products/{id}/threshold", patch(update_threshold))
        .route("/api/products/{id}/stock", post(adjust_stock))
        .route("/api/products/{id}/audit", get(audit))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub quantity: i64,
    pub reorder_threshold: Option<i64>,
    pub supplier: Option<String>,
    pub supplier_phone: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdateRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub cost: Option<Decimal>,
    pub reorder_threshold: Option<i64>,
    pub supplier: Option<String>,
    pub supplier_phone: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementsQuery {
    pub product_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub threshold: i64,
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub success: bool,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub product_id: i64,
    pub initial_quantity: i64,
    pub movements_total: i64,
    pub quantity: i64,
    pub consistent: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkImportRequest {
    pub products: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ImportError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BulkImportResponse {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<ImportError>,
}

// =============================================================================
// Validation
// =============================================================================

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn check_optional_fields(
    barcode: &Option<String>,
    supplier_phone: &Option<String>,
    country_code: &str,
) -> ApiResult<()> {
    if let Some(barcode) = trimmed(barcode) {
        validate_barcode(&barcode)?;
    }
    if let Some(phone) = trimmed(supplier_phone) {
        validate_contact_phone(&phone, country_code)?;
    }
    Ok(())
}

/// Validates a create request and converts it to repository input.
pub fn build_new_product(request: &ProductRequest, country_code: &str) -> ApiResult<NewProduct> {
    validate_name("name", &request.name)?;

    let price = to_money("price", request.price)?;
    validate_price("price", price)?;
    let cost = match request.cost {
        Some(cost) => to_money("cost", cost)?,
        None => Default::default(),
    };
    validate_price("cost", cost)?;

    validate_non_negative("quantity", request.quantity)?;
    let threshold = request.reorder_threshold.unwrap_or(DEFAULT_REORDER_THRESHOLD);
    validate_non_negative("reorderThreshold", threshold)?;
    check_optional_fields(&request.barcode, &request.supplier_phone, country_code)?;

    Ok(NewProduct {
        name: request.name.trim().to_string(),
        category: trimmed(&request.category),
        description: trimmed(&request.description),
        price_cents: price.cents(),
        cost_cents: cost.cents(),
        quantity: request.quantity,
        reorder_threshold: Some(threshold),
        supplier: trimmed(&request.supplier),
        supplier_phone: trimmed(&request.supplier_phone),
        barcode: trimmed(&request.barcode),
        image_url: trimmed(&request.image_url),
    })
}

fn build_update(request: &ProductUpdateRequest, country_code: &str) -> ApiResult<ProductUpdate> {
    if let Some(name) = &request.name {
        validate_name("name", name)?;
    }
    let price_cents = match request.price {
        Some(price) => {
            let price = to_money("price", price)?;
            validate_price("price", price)?;
            Some(price.cents())
        }
        None => None,
    };
    let cost_cents = match request.cost {
        Some(cost) => {
            let cost = to_money("cost", cost)?;
            validate_price("cost", cost)?;
            Some(cost.cents())
        }
        None => None,
    };
    if let Some(threshold) = request.reorder_threshold {
        validate_non_negative("reorderThreshold", threshold)?;
    }
    check_optional_fields(&request.barcode, &request.supplier_phone, country_code)?;

    Ok(ProductUpdate {
        name: request.name.as_deref().map(|n| n.trim().to_string()),
        category: trimmed(&request.category),
        description: trimmed(&request.description),
        price_cents,
        cost_cents,
        reorder_threshold: request.reorder_threshold,
        supplier: trimmed(&request.supplier),
        supplier_phone: trimmed(&request.supplier_phone),
        barcode: trimmed(&request.barcode),
        image_url: trimmed(&request.image_url),
    })
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Product {} not found", id))
}

// =============================================================================
// Catalogue
// =============================================================================

async fn create_product(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiJson(request): ApiJson<ProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = build_new_product(&request, state.country_code())?;
    let product = state.db.products().create(business.id, &product).await?;

    info!(product_id = product.id, business_id = business.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiQuery(query): ApiQuery<ProductsQuery>,
) -> ApiResult<Json<Page<Product>>> {
    let search = match query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => Some(validate_search_query(term)?),
        None => None,
    };

    let page = state
        .db
        .products()
        .list(
            business.id,
            &ProductListQuery {
                search,
                category: trimmed(&query.category),
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

async fn get_product(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    state
        .db
        .products()
        .get(business.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn by_barcode(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(code): Path<String>,
) -> ApiResult<Json<Product>> {
    state
        .db
        .products()
        .find_by_barcode(business.id, code.trim())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No product with barcode {}", code)))
}

async fn low_stock(State(state): State<AppState>, business: BusinessContext) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().low_stock(business.id).await?))
}

async fn update_product(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<ProductUpdateRequest>,
) -> ApiResult<Json<Product>> {
    let update = build_update(&request, state.country_code())?;
    let product = state.db.products().update(business.id, id, &update).await?;

    state.stock().recheck(business.id, id);
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Success>> {
    state.db.products().delete(business.id, id).await?;
    Ok(Json(Success::ok()))
}

async fn update_threshold(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<ThresholdRequest>,
) -> ApiResult<Json<Product>> {
    validate_non_negative("threshold", request.threshold)?;
    let product = state
        .db
        .products()
        .update_threshold(business.id, id, request.threshold)
        .await?;

    state.stock().recheck(business.id, id);
    Ok(Json(product))
}

/// Validates every row on its own, then inserts the valid ones in one
/// transaction. Invalid rows are reported and skipped.
async fn bulk_import(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiJson(request): ApiJson<BulkImportRequest>,
) -> ApiResult<Json<BulkImportResponse>> {
    if request.products.len() > MAX_IMPORT_ROWS {
        return Err(ApiError::validation(format!(
            "At most {} products per import",
            MAX_IMPORT_ROWS
        )));
    }

    let mut valid = Vec::with_capacity(request.products.len());
    let mut errors = Vec::new();

    for (row, raw) in request.products.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ProductRequest>(raw)
            .map_err(|e| ApiError::validation(e.to_string()))
            .and_then(|req| build_new_product(&req, state.country_code()));

        match parsed {
            Ok(product) => valid.push(product),
            Err(e) => errors.push(ImportError {
                row,
                message: e.to_string(),
            }),
        }
    }

    let inserted = if valid.is_empty() {
        0
    } else {
        state.db.products().create_many(business.id, &valid).await?.len()
    };

    info!(
        business_id = business.id,
        inserted,
        failed = errors.len(),
        "Bulk import finished"
    );

    Ok(Json(BulkImportResponse {
        success: inserted,
        failed: errors.len(),
        errors,
    }))
}

// =============================================================================
// Stock ledger
// =============================================================================

async fn adjust_stock(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<StockRequest>,
) -> ApiResult<Json<StockResponse>> {
    let reason = match request.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => StockReason::from_str(reason)?,
        None => StockReason::default(),
    };
    debug!(product_id = id, business_id = business.id, delta = request.quantity, reason = %reason, "adjust_stock");

    let level = state.stock().adjust(business.id, id, request.quantity, reason).await?;

    Ok(Json(StockResponse {
        success: true,
        quantity: level.quantity,
    }))
}

async fn movements(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiQuery(query): ApiQuery<MovementsQuery>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    let limit = page_limit(query.limit, DEFAULT_PAGE, MAX_MOVEMENTS);
    let movements = state
        .db
        .stock()
        .movements(business.id, query.product_id, limit)
        .await?;
    Ok(Json(movements))
}

async fn audit(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<AuditResponse>> {
    if state.db.products().get(business.id, id).await?.is_none() {
        return Err(not_found(id));
    }

    let audit = state.db.stock().audit(id).await?;
    Ok(Json(AuditResponse {
        product_id: audit.product_id,
        initial_quantity: audit.initial_quantity,
        movements_total: audit.movements_total,
        quantity: audit.quantity,
        consistent: audit.is_consistent(),
    }))
}
