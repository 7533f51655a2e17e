//! Fixtures shared by the repository tests.

use stockconnect_core::{Customer, Product};

use crate::repository::customer::NewCustomer;
use crate::repository::product::NewProduct;
use crate::{Database, DbConfig};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) async fn seed_business(db: &Database, name: &str) -> i64 {
    db.businesses().create(name, None).await.unwrap().id
}

/// Product priced at 500.00, cost 300.00, reorder threshold 5.
pub(crate) async fn seed_product(db: &Database, business_id: i64, name: &str, quantity: i64) -> Product {
    let product = NewProduct {
        name: name.to_string(),
        price_cents: 50_000,
        cost_cents: 30_000,
        quantity,
        ..NewProduct::default()
    };
    db.products().create(business_id, &product).await.unwrap()
}

pub(crate) async fn seed_customer(db: &Database, business_id: i64, name: &str) -> Customer {
    let customer = NewCustomer {
        name: name.to_string(),
        phone: "+2348031234567".to_string(),
        email: None,
    };
    db.customers().create(business_id, &customer).await.unwrap()
}
