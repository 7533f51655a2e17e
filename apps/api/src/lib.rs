//! # StockConnect API
//!
//! REST + WebSocket server for the StockConnect dashboard and POS clients.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          API Server                                     │
//! │                                                                         │
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────────────────────┐│
//! │  │ routes/      │   │ services/      │   │ stockconnect-db            ││
//! │  │ orders       │──►│ OrderService   │──►│ orders / products / stock  ││
//! │  │ products     │   │ StockService   │   │ customers / settings       ││
//! │  │ customers    │   └───────┬────────┘   └────────────────────────────┘│
//! │  │ settings     │           │ after commit                             │
//! │  │ analytics    │           ▼                                          │
//! │  │ events (ws)◄─┼── EventHub ◄── SideEffectWorker (stockconnect-notify) │
//! │  │ health       │                                                       │
//! │  └──────────────┘                                                       │
//! │                                                                         │
//! │  Every /api route resolves a BusinessContext from X-Business-Id.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `STOCKCONNECT_PORT` / `STOCKCONNECT_BIND` - listen address (default: 0.0.0.0:5000)
//! - `DATABASE_PATH` - SQLite file (default: stockconnect.db)
//! - `ALLOW_NEGATIVE_STOCK` - let sales drive stock below zero (default: true)
//! - `VERIFY_ORDER_TOTAL` - reject totals that disagree with the lines (default: false)
//! - `CANCELLATION_MODE` - `status_only` or `reverse_effects`
//! - `RUST_LOG` - tracing filter

pub mod business;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
