//! # Customer Routes
//!
//! Loyalty customers. Phones are stored normalised to international form so
//! the same person typed two ways is one record.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use stockconnect_core::validation::{
    normalize_phone_number, page_limit, validate_contact_phone, validate_email, validate_name,
    validate_search_query,
};
use stockconnect_core::{Customer, OrderWithItems};
use stockconnect_db::{CustomerUpdate, NewCustomer};

use crate::business::BusinessContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route("/api/customers/{id}", get(get_customer).put(update_customer))
}

#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomersQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A customer with their order history.
#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub orders: Vec<OrderWithItems>,
}

fn clean_email(email: Option<&str>) -> ApiResult<Option<String>> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => {
            validate_email(email)?;
            Ok(Some(email.to_string()))
        }
        None => Ok(None),
    }
}

fn clean_phone(phone: &str, country_code: &str) -> ApiResult<String> {
    validate_contact_phone(phone, country_code)?;
    Ok(normalize_phone_number(phone, country_code))
}

async fn create_customer(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiJson(request): ApiJson<CustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    validate_name("name", &request.name)?;
    let customer = NewCustomer {
        name: request.name.trim().to_string(),
        phone: clean_phone(&request.phone, state.country_code())?,
        email: clean_email(request.email.as_deref())?,
    };

    let customer = state.db.customers().create(business.id, &customer).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn list_customers(
    State(state): State<AppState>,
    business: BusinessContext,
    ApiQuery(query): ApiQuery<CustomersQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    let search = match query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => Some(validate_search_query(term)?),
        None => None,
    };

    let customers = state
        .db
        .customers()
        .list(
            business.id,
            search.as_deref(),
            page_limit(query.limit, DEFAULT_PAGE, MAX_PAGE),
            query.offset.unwrap_or(0).max(0),
        )
        .await?;
    Ok(Json(customers))
}

async fn get_customer(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<CustomerDetail>> {
    let customer = state
        .db
        .customers()
        .get(business.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Customer {} not found", id)))?;
    let orders = state.db.orders().list_for_customer(business.id, id).await?;

    Ok(Json(CustomerDetail { customer, orders }))
}

async fn update_customer(
    State(state): State<AppState>,
    business: BusinessContext,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<CustomerUpdateRequest>,
) -> ApiResult<Json<Customer>> {
    if let Some(name) = &request.name {
        validate_name("name", name)?;
    }
    let phone = match request.phone.as_deref() {
        Some(phone) => Some(clean_phone(phone, state.country_code())?),
        None => None,
    };

    let update = CustomerUpdate {
        name: request.name.as_deref().map(|n| n.trim().to_string()),
        phone,
        email: clean_email(request.email.as_deref())?,
    };

    let customer = state.db.customers().update(business.id, id, &update).await?;
    info!(customer_id = id, business_id = business.id, "Customer updated");
    Ok(Json(customer))
}
