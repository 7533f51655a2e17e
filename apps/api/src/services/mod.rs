//! Business operations that span a repository call and its post-commit
//! side effects. Route handlers stay thin and call into these.

pub mod order_service;
pub mod stock_service;

pub use order_service::{to_money, CreateOrderRequest, OrderLineRequest, OrderService};
pub use stock_service::StockService;
