//! Router tests: real handlers, in-memory SQLite, a running side-effect
//! worker and a recording dispatcher.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use stockconnect_api::{build_router, ApiConfig, AppState};
use stockconnect_db::{Database, DbConfig};
use stockconnect_notify::{
    EventHub, EventKind, EventSubscription, LowStockNotifier, NotifyConfig, RecordingDispatcher,
    SideEffectWorker, SideEffectWorkerHandle,
};

struct TestApp {
    app: Router,
    db: Database,
    hub: EventHub,
    dispatcher: RecordingDispatcher,
    business_id: i64,
    // The worker stops once every handle is dropped
    _worker: SideEffectWorkerHandle,
}

async fn spawn_app_with(vars: &[(&str, &str)]) -> TestApp {
    let vars: Vec<(String, String)> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let config = ApiConfig::from_lookup(|key| {
        vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    })
    .unwrap();
    let config = Arc::new(config);

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let dispatcher = RecordingDispatcher::new();
    let hub = EventHub::new(64);
    let notifier = LowStockNotifier::new(
        db.clone(),
        Arc::new(dispatcher.clone()),
        Arc::new(NotifyConfig::default()),
    );
    let (worker, queue, handle) = SideEffectWorker::new(notifier, hub.clone(), 64);
    tokio::spawn(worker.run());

    let business_id = db
        .businesses()
        .create("Mama Tobi Provisions", Some("+2348030001111"))
        .await
        .unwrap()
        .id;

    let app = build_router(AppState::new(db.clone(), queue, hub.clone(), config));

    TestApp {
        app,
        db,
        hub,
        dispatcher,
        business_id,
        _worker: handle,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(&[]).await
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, business: Option<i64>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = business {
            builder = builder.header("X-Business-Id", id.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(self.business_id), None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(self.business_id), Some(body)).await
    }

    async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(self.business_id), Some(body)).await
    }

    async fn create_product(&self, name: &str, quantity: i64, price: f64) -> i64 {
        let (status, body) = self
            .post(
                "/api/products",
                json!({
                    "name": name,
                    "price": price,
                    "cost": price / 2.0,
                    "quantity": quantity,
                    "reorderThreshold": 5,
                    "supplier": "Dangote Distributors",
                    "supplierPhone": "0803 123 4567"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    async fn quantity(&self, product_id: i64) -> i64 {
        let (_, body) = self.get(&format!("/api/products/{}", product_id)).await;
        body["quantity"].as_i64().unwrap()
    }
}

async fn next_event(sub: &mut EventSubscription) -> EventKind {
    tokio::time::timeout(Duration::from_secs(2), sub.recv())
        .await
        .expect("timed out waiting for event")
        .expect("hub closed")
        .kind
}

// =============================================================================
// Health and business scoping
// =============================================================================

#[tokio::test]
async fn test_health_needs_no_business() {
    let app = spawn_app().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_business_header_is_required() {
    let app = spawn_app().await;

    let (status, body) = app.call(Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.call(Method::GET, "/api/products", Some(9999), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, &format!("/api/products?businessId={}", app.business_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_other_business_rows_are_invisible() {
    let app = spawn_app().await;
    let product_id = app.create_product("Milo 400g", 10, 2500.0).await;
    let other = app.db.businesses().create("Rival Stores", None).await.unwrap().id;

    let (status, body) = app
        .call(Method::GET, &format!("/api/products/{}", product_id), Some(other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_checkout_flow() {
    let app = spawn_app().await;
    let rice = app.create_product("Mama Gold Rice 10kg", 8, 15000.0).await;
    let oil = app.create_product("Kings Oil 1L", 30, 2200.5).await;
    let mut events = app.hub.subscribe(app.business_id);

    let (status, body) = app
        .post(
            "/api/orders",
            json!({
                "items": [
                    {"productId": rice, "quantity": 4, "unitPrice": 15000},
                    {"productId": oil, "quantity": 2, "unitPrice": 2200.5}
                ],
                "totalAmount": 64401,
                "paymentMethod": "transfer"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body, json!({"id": body["id"], "success": true}));
    let order_id = body["id"].as_i64().unwrap();

    let (status, order) = app.get(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "confirmed");
    assert_eq!(order["payment_method"], "transfer");
    assert_eq!(order["total_cents"], 6_440_100);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][1]["unit_price_cents"], 220_050);

    assert_eq!(app.quantity(rice).await, 4);
    assert_eq!(app.quantity(oil).await, 28);

    assert_eq!(
        next_event(&mut events).await,
        EventKind::SaleCompleted {
            order_id,
            business_id: app.business_id
        }
    );
    // Rice fell to its threshold; the check ran before the event
    let messages = app.dispatcher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].to, "+2348031234567");
    assert!(messages[0].body.contains("Mama Gold Rice 10kg is down to 4 units at Mama Tobi Provisions"));

    let (_, page) = app.get("/api/orders?status=confirmed").await;
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn test_order_rejections() {
    let app = spawn_app().await;
    let rice = app.create_product("Rice", 5, 1000.0).await;

    let (status, body) = app
        .post(
            "/api/orders",
            json!({"items": [{"productId": rice, "quantity": 0, "unitPrice": 1000}], "totalAmount": 1000}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post("/api/orders", json!({"items": [], "totalAmount": 1000}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/orders",
            json!({"items": [{"productId": 424242, "quantity": 1, "unitPrice": 1000}], "totalAmount": 1000}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app
        .post(
            "/api/orders",
            json!({"customerId": 77, "items": [{"productId": rice, "quantity": 1, "unitPrice": 1000}], "totalAmount": 1000}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(Method::POST, "/api/orders", Some(app.business_id), Some(json!({"items": "nope"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    assert_eq!(app.quantity(rice).await, 5);
}

#[tokio::test]
async fn test_negative_stock_allowed_by_default() {
    let app = spawn_app().await;
    let rice = app.create_product("Rice", 3, 1000.0).await;

    let (status, _) = app
        .post(
            "/api/orders",
            json!({"items": [{"productId": rice, "quantity": 5, "unitPrice": 1000}], "totalAmount": 5000}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.quantity(rice).await, -2);
}

#[tokio::test]
async fn test_floor_policy_returns_insufficient_stock() {
    let app = spawn_app_with(&[("ALLOW_NEGATIVE_STOCK", "false")]).await;
    let rice = app.create_product("Rice", 3, 1000.0).await;
    let beans = app.create_product("Beans", 10, 800.0).await;

    let (status, body) = app
        .post(
            "/api/orders",
            json!({
                "items": [
                    {"productId": beans, "quantity": 2, "unitPrice": 800},
                    {"productId": rice, "quantity": 5, "unitPrice": 1000}
                ],
                "totalAmount": 6600
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    assert_eq!(app.quantity(rice).await, 3);
    assert_eq!(app.quantity(beans).await, 10);
    let (_, page) = app.get("/api/orders").await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_total_verification() {
    let app = spawn_app_with(&[("VERIFY_ORDER_TOTAL", "true")]).await;
    let rice = app.create_product("Rice", 10, 1000.0).await;

    let (status, body) = app
        .post(
            "/api/orders",
            json!({"items": [{"productId": rice, "quantity": 2, "unitPrice": 1000}], "totalAmount": 1500}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .post(
            "/api/orders",
            json!({"items": [{"productId": rice, "quantity": 999, "unitPrice": 1e16}], "totalAmount": 1000}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.quantity(rice).await, 10);
}

#[tokio::test]
async fn test_status_machine_over_http() {
    let app = spawn_app().await;
    let rice = app.create_product("Rice", 10, 1000.0).await;
    let (_, body) = app
        .post(
            "/api/orders",
            json!({"items": [{"productId": rice, "quantity": 1, "unitPrice": 1000}], "totalAmount": 1000}),
        )
        .await;
    let order_id = body["id"].as_i64().unwrap();
    let mut events = app.hub.subscribe(app.business_id);
    let uri = format!("/api/orders/{}/status", order_id);

    let (status, body) = app.patch(&uri, json!({"status": "delivered"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "status": "delivered"}));

    // Skip the sale_completed still in flight if the worker was slow
    loop {
        if let EventKind::OrderStatusUpdated { order_id: id, status } = next_event(&mut events).await {
            assert_eq!(id, order_id);
            assert_eq!(status.as_str(), "delivered");
            break;
        }
    }

    let (status, body) = app.patch(&uri, json!({"status": "pending"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app.patch(&uri, json!({"status": "shipped"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.patch("/api/orders/999/status", json!({"status": "delivered"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_endpoint_reverses_stock_and_loyalty() {
    let app = spawn_app().await;
    let rice = app.create_product("Rice", 10, 1000.0).await;
    let (status, customer) = app
        .post("/api/customers", json!({"name": "Ngozi Eze", "phone": "0805 555 1234"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(customer["phone"], "+2348055551234");
    let customer_id = customer["id"].as_i64().unwrap();

    let (_, body) = app
        .post(
            "/api/orders",
            json!({
                "customerId": customer_id,
                "items": [{"productId": rice, "quantity": 3, "unitPrice": 1000}],
                "totalAmount": 3000
            }),
        )
        .await;
    let order_id = body["id"].as_i64().unwrap();
    let (_, detail) = app.get(&format!("/api/customers/{}", customer_id)).await;
    assert!(detail["loyalty_points"].as_i64().unwrap() > 0);

    let (status, body) = app.post(&format!("/api/orders/{}/cancel", order_id), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body, json!({"success": true, "status": "cancelled"}));
    assert_eq!(app.quantity(rice).await, 10);

    let (_, detail) = app.get(&format!("/api/customers/{}", customer_id)).await;
    assert_eq!(detail["loyalty_points"], 0);
    assert_eq!(detail["orders"][0]["status"], "cancelled");
    assert_eq!(detail["orders"][0]["items"][0]["quantity"], 3);

    let (status, _) = app.post(&format!("/api/orders/{}/cancel", order_id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// Products and stock
// =============================================================================

#[tokio::test]
async fn test_manual_adjustment_and_audit() {
    let app = spawn_app().await;
    let milk = app.create_product("Peak Milk", 10, 400.0).await;
    let mut events = app.hub.subscribe(app.business_id);

    let (status, body) = app
        .post(&format!("/api/products/{}/stock", milk), json!({"quantity": -6, "reason": "damage"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "quantity": 4}));

    assert_eq!(
        next_event(&mut events).await,
        EventKind::StockAdjusted {
            product_id: milk,
            quantity: 4,
            reason: stockconnect_core::StockReason::Damage
        }
    );
    assert_eq!(app.dispatcher.messages().len(), 1);

    let (status, _) = app
        .post(&format!("/api/products/{}/stock", milk), json!({"quantity": 0}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, movements) = app.get(&format!("/api/products/movements?productId={}", milk)).await;
    assert_eq!(movements.as_array().unwrap().len(), 1);
    assert_eq!(movements[0]["change_amount"], -6);
    assert_eq!(movements[0]["reason"], "damage");

    let (_, audit) = app.get(&format!("/api/products/{}/audit", milk)).await;
    assert_eq!(audit["initialQuantity"], 10);
    assert_eq!(audit["movementsTotal"], -6);
    assert_eq!(audit["consistent"], true);
}

#[tokio::test]
async fn test_product_catalogue_operations() {
    let app = spawn_app().await;
    let (status, created) = app
        .post(
            "/api/products",
            json!({"name": "Dangote Sugar 500g", "category": "Groceries", "price": 900, "barcode": "6151100010019", "quantity": 12}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .post("/api/products", json!({"name": "Copycat", "price": 100, "barcode": "6151100010019"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, found) = app.get("/api/products/barcode/6151100010019").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], id);

    let (_, page) = app.get("/api/products?search=sugar").await;
    assert_eq!(page["total"], 1);

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/products/{}", id),
            Some(app.business_id),
            Some(json!({"price": 950.25, "quantity": 999})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price_cents"], 95_025);
    // Quantity is not editable here
    assert_eq!(updated["quantity"], 12);

    let (_, product) = app
        .patch(&format!("/api/products/{}/threshold", id), json!({"threshold": 20}))
        .await;
    assert_eq!(product["reorder_threshold"], 20);
    let (_, low) = app.get("/api/products/low-stock").await;
    assert_eq!(low.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/products/{}", id), Some(app.business_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/products/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sold_product_cannot_be_deleted() {
    let app = spawn_app().await;
    let rice = app.create_product("Rice", 10, 1000.0).await;
    app.post(
        "/api/orders",
        json!({"items": [{"productId": rice, "quantity": 1, "unitPrice": 1000}], "totalAmount": 1000}),
    )
    .await;

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/products/{}", rice), Some(app.business_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_bulk_import_reports_bad_rows() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/products/bulk-import",
            json!({"products": [
                {"name": "Golden Penny Spaghetti", "price": 650, "quantity": 40},
                {"name": "", "price": 100},
                {"name": "Ovaltine 400g", "price": "free"},
                {"name": "Bournvita 500g", "price": 3100.5, "quantity": 6}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], 2);
    assert_eq!(body["failed"], 2);
    assert_eq!(body["errors"][0]["row"], 1);
    assert_eq!(body["errors"][1]["row"], 2);

    let (_, page) = app.get("/api/products").await;
    assert_eq!(page["total"], 2);
}

// =============================================================================
// Customers, settings, analytics
// =============================================================================

#[tokio::test]
async fn test_customer_crud() {
    let app = spawn_app().await;
    let (status, _) = app
        .post("/api/customers", json!({"name": "Bad Phone", "phone": "12"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, created) = app
        .post("/api/customers", json!({"name": "Emeka Nwosu", "phone": "+2348021234567", "email": "emeka@example.com"}))
        .await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/customers/{}", id),
            Some(app.business_id),
            Some(json!({"name": "Emeka N. Nwosu"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Emeka N. Nwosu");
    assert_eq!(updated["email"], "emeka@example.com");

    let (_, list) = app.get("/api/customers?search=emeka").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_settings_and_summary() {
    let app = spawn_app().await;

    let (status, settings) = app.get("/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["business_id"], app.business_id);

    let (status, settings) = app
        .patch(
            "/api/settings",
            json!({"loyaltyPointsPerUnit": 2, "currencyUnitForPoints": 50, "lowStockNotifications": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["loyalty_points_per_unit"], 2);
    assert_eq!(settings["currency_unit_for_points_cents"], 5000);
    assert_eq!(settings["low_stock_notifications"], false);

    let (status, _) = app.patch("/api/settings", json!({"taxRateBps": 20000})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app
        .patch("/api/settings", json!({"loyaltyPointsPerUnit": 9_000_000_000_000_000_000i64}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let rice = app.create_product("Rice", 3, 1000.0).await;
    app.post(
        "/api/orders",
        json!({"items": [{"productId": rice, "quantity": 1, "unitPrice": 1000}], "totalAmount": 1000}),
    )
    .await;

    let (_, summary) = app.get("/api/analytics/summary").await;
    assert_eq!(summary["productCount"], 1);
    assert_eq!(summary["lowStockCount"], 1);
    assert_eq!(summary["orderCount"], 1);
    assert_eq!(summary["revenue"], 1000.0);
}
