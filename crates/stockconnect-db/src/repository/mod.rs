//! # Repository Module
//!
//! One repository per aggregate, each a thin owner of a `SqlitePool` clone.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database (pool.rs)                                                     │
//! │       │                                                                 │
//! │       ├── businesses()  → BusinessRepository   tenants                  │
//! │       ├── products()    → ProductRepository    catalogue, thresholds    │
//! │       ├── customers()   → CustomerRepository   customers, balances      │
//! │       ├── orders()      → OrderRepository      checkout, status, cancel │
//! │       ├── settings()    → SettingsRepository   per-business settings    │
//! │       └── stock()       → StockRepository      adjustments, ledger      │
//! │                                                                         │
//! │  Every method that writes more than one row opens a transaction on      │
//! │  the pool and runs all of its statements on that one connection.       │
//! │  Nothing reaches back to the pool while a transaction is open.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`business::BusinessRepository`] - Tenant rows
//! - [`product::ProductRepository`] - Product CRUD, search, low stock
//! - [`customer::CustomerRepository`] - Customer CRUD and search
//! - [`order::OrderRepository`] - Atomic order creation and the status machine
//! - [`settings::SettingsRepository`] - Lazily created settings rows
//! - [`stock::StockRepository`] - Manual adjustments and the movement ledger

pub mod business;
pub mod customer;
pub mod order;
pub mod product;
pub mod settings;
pub mod stock;

/// Escapes `%` and `_` so user input matches literally inside `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
