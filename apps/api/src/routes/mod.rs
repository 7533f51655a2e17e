//! # Routes
//!
//! One module per resource. Each exposes `router()` with absolute paths;
//! [`build_router`] merges them and applies the HTTP layers.
//!
//! ```text
//! /health                 health.rs     public
//! /api/orders/*           orders.rs     X-Business-Id
//! /api/products/*         products.rs   X-Business-Id
//! /api/customers/*        customers.rs  X-Business-Id
//! /api/settings           settings.rs   X-Business-Id
//! /api/analytics/summary  analytics.rs  X-Business-Id
//! /api/events             events.rs     X-Business-Id (WebSocket)
//! ```

use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::business::BUSINESS_HEADER;
use crate::state::AppState;

pub mod analytics;
pub mod customers;
pub mod events;
pub mod health;
pub mod orders;
pub mod products;
pub mod settings;

/// A page of records plus the unpaged count.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
}

/// `{ "success": true }`
#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> Self {
        Success { success: true }
    }
}

/// Builds the full application router with state, CORS and tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(products::router())
        .merge(customers::router())
        .merge(settings::router())
        .merge(analytics::router())
        .merge(events::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(BUSINESS_HEADER),
        ])
}
