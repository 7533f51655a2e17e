//! # Business Context Extractor
//!
//! Every `/api` route acts on behalf of one business, named by the
//! `X-Business-Id` header. Handlers take a [`BusinessContext`] argument and
//! pass its id to every repository call, so a request can only ever see
//! its own rows.
//!
//! The header wins; a `businessId` query parameter is accepted in its place
//! for clients that cannot set headers (browser WebSockets).
//!
//! ```text
//! X-Business-Id: 3 ──► parse ──► businesses.exists(3) ──► BusinessContext { id: 3 }
//!        │                │               │
//!     missing          not i64          unknown
//!        └────────────────┴───────────────┴──► 401 UNAUTHORIZED
//! ```

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub const BUSINESS_HEADER: &str = "x-business-id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BusinessQuery {
    business_id: Option<String>,
}

/// The business the current request acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessContext {
    pub id: i64,
}

impl FromRequestParts<AppState> for BusinessContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<BusinessContext>() {
            return Ok(*ctx);
        }

        let from_query = || {
            Query::<BusinessQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.business_id)
        };
        let raw = parts
            .headers
            .get(BUSINESS_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(from_query);
        let raw = raw.as_deref().map(str::trim).filter(|v| !v.is_empty());

        let Some(raw) = raw else {
            debug!(uri = ?parts.uri, "Request without business header");
            return Err(ApiError::Unauthorized("X-Business-Id header is required".to_string()));
        };

        let id: i64 = raw
            .parse()
            .map_err(|_| ApiError::Unauthorized("X-Business-Id must be a numeric id".to_string()))?;

        if !state.db.businesses().exists(id).await? {
            warn!(business_id = id, uri = ?parts.uri, "Request for unknown business");
            return Err(ApiError::Unauthorized(format!("Unknown business {}", id)));
        }

        let ctx = BusinessContext { id };
        parts.extensions.insert(ctx);
        Ok(ctx)
    }
}
