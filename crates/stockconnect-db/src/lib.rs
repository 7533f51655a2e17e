//! # stockconnect-db: Ledger Store for StockConnect
//!
//! SQLite access through sqlx: the pool, embedded migrations, and one
//! repository per aggregate. Every multi-row write runs in a single
//! transaction owned by this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       StockConnect Data Flow                            │
//! │                                                                         │
//! │  OrderService (apps/api) ── ownership checked, input validated          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockconnect-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────────┐   ┌────────────┐  │   │
//! │  │   │   Database    │   │   Repositories     │   │ Migrations │  │   │
//! │  │   │   (pool.rs)   │◄──│ orders   products  │   │ (embedded) │  │   │
//! │  │   │  SqlitePool   │   │ stock    customers │   │            │  │   │
//! │  │   └───────────────┘   │ settings businesses│   └────────────┘  │   │
//! │  │                       └─────────┬──────────┘                   │   │
//! │  │                                 │                              │   │
//! │  │                 stock::apply_stock_delta (the engine)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockconnect_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockconnect.db")).await?;
//! let order = db.orders().create_order(&new_order, StockPolicy::permissive()).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::business::BusinessRepository;
pub use repository::customer::{CustomerRepository, CustomerUpdate, NewCustomer};
pub use repository::order::{
    CancelledOrder, CreatedOrder, NewOrder, NewOrderLine, OrderListQuery, OrderPage,
    OrderRepository, OrderTotals, StatusChange,
};
pub use repository::product::{NewProduct, ProductListQuery, ProductPage, ProductRepository, ProductUpdate};
pub use repository::settings::{SettingsRepository, SettingsUpdate};
pub use repository::stock::{apply_stock_delta, StockChange, StockRepository};
