#![allow(dead_code)]

//! Shared helpers for the engine integration tests. Each test gets a throwaway SQLite database under the
//! system temp directory, with migrations applied.

use market_order_engine::{
    db_types::{GatewayEvent, GatewayEventKind, NewOrderRequest, NewProduct, Product, ShippingAddress},
    events::EventProducers,
    helpers::PricingPolicy,
    OrderFlowApi,
    SqliteDatabase,
    WebhookReconciler,
};
use mos_common::Money;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_db(tag: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("mos_{tag}_{}.db", rand::random::<u64>()));
    let url = format!("sqlite://{}", path.display());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let db = SqliteDatabase::new_with_url(&url, 8).await.expect("Error connecting to test database");
    db.run_migrations().await.expect("Error running migrations");
    db
}

pub fn flow_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), PricingPolicy::default(), EventProducers::default())
}

pub fn reconciler(db: &SqliteDatabase) -> WebhookReconciler<SqliteDatabase> {
    WebhookReconciler::new(db.clone(), EventProducers::default())
}

pub async fn seed_product(db: &SqliteDatabase, seller: &str, name: &str, price_cents: i64, stock: i64) -> Product {
    db.insert_product(NewProduct {
        seller_id: seller.to_string(),
        name: name.to_string(),
        description: format!("{name} (test listing)"),
        price: Money::from_cents(price_cents),
        stock,
    })
    .await
    .expect("Error seeding product")
}

pub async fn fill_cart(db: &SqliteDatabase, user: &str, product_id: i64, quantity: i64) {
    db.add_to_cart(user, product_id, quantity).await.expect("Error filling cart");
}

pub fn order_request() -> NewOrderRequest {
    NewOrderRequest {
        shipping_address: ShippingAddress {
            street: "12 Harbour Lane".to_string(),
            city: "Port Devon".to_string(),
            state: "WC".to_string(),
            zip_code: "8001".to_string(),
            country: "ZA".to_string(),
        },
        payment_method: "card".to_string(),
        notes: None,
    }
}

pub async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    use market_order_engine::traits::OrderManagement;
    db.fetch_product(product_id).await.expect("Error fetching product").expect("Product missing").stock
}

pub fn paid_event(event_id: &str, order_id: i64, amount_cents: i64) -> GatewayEvent {
    GatewayEvent {
        event_id: event_id.to_string(),
        kind: GatewayEventKind::PaymentSucceeded,
        order_id: Some(order_id),
        amount: Some(Money::from_cents(amount_cents)),
        currency: Some("usd".to_string()),
        failure_reason: None,
    }
}

pub fn checkout_completed_event(event_id: &str, order_id: i64, amount_cents: i64) -> GatewayEvent {
    GatewayEvent { kind: GatewayEventKind::CheckoutCompleted, ..paid_event(event_id, order_id, amount_cents) }
}

pub fn failed_event(event_id: &str, order_id: i64, reason: &str) -> GatewayEvent {
    GatewayEvent {
        event_id: event_id.to_string(),
        kind: GatewayEventKind::PaymentFailed,
        order_id: Some(order_id),
        amount: None,
        currency: None,
        failure_reason: Some(reason.to_string()),
    }
}

pub fn expired_event(event_id: &str, order_id: i64) -> GatewayEvent {
    GatewayEvent {
        event_id: event_id.to_string(),
        kind: GatewayEventKind::CheckoutExpired,
        order_id: Some(order_id),
        amount: None,
        currency: None,
        failure_reason: None,
    }
}
