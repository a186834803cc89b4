//! `SqliteDatabase` is a concrete order-engine backend over SQLite.
//!
//! It implements the traits in the [`crate::traits`] module. Every money- or stock-moving flow runs inside a
//! single `BEGIN IMMEDIATE` transaction, so a failure at any step rolls the whole unit of work back and the
//! store is left as if the call never started.

use std::fmt::Debug;

use log::*;
use mos_common::Money;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{self, carts, orders, payment_events, products, refunds};
use crate::{
    db_types::{
        CartLine,
        GatewayEvent,
        GatewayEventKind,
        NewOrderRequest,
        NewProduct,
        NewRefund,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatus,
        PaymentEvent,
        Product,
        RefundRecord,
        WebhookOutcome,
    },
    helpers::{self, PricingPolicy},
    traits::{OrderFlowDatabase, OrderFlowError, OrderManagement, OrderQueryError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = db::new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    // ---- catalog and cart maintenance, used by seeding and by the cart service upstream ----

    pub async fn insert_product(&self, product: NewProduct) -> Result<Product, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("📦️ Product {} ({}) listed by {}", product.id, product.name, product.seller_id);
        Ok(product)
    }

    pub async fn add_to_cart(&self, user_id: &str, product_id: i64, quantity: i64) -> Result<(), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        carts::upsert_line(user_id, product_id, quantity, &mut conn).await
    }

    pub async fn set_product_stock(&self, product_id: i64, stock: i64) -> Result<(), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        products::set_stock(product_id, stock, &mut conn).await?;
        Ok(())
    }

    pub async fn set_product_active(&self, product_id: i64, active: bool) -> Result<(), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        products::set_active(product_id, active, &mut conn).await?;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn fetch_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_payment_intent(payment_intent_id, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_user(user_id, &mut conn).await?)
    }

    async fn order_contains_seller(&self, order_id: i64, seller_id: &str) -> Result<bool, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::order_contains_seller(order_id, seller_id, &mut conn).await?)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }

    async fn fetch_cart(&self, user_id: &str) -> Result<Vec<CartLine>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::cart_lines(user_id, &mut conn).await?)
    }

    async fn fetch_refunds_for_order(&self, order_id: i64) -> Result<Vec<RefundRecord>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(refunds::fetch_refunds(order_id, &mut conn).await?)
    }

    async fn fetch_payment_event(&self, event_id: &str) -> Result<Option<PaymentEvent>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_events::fetch_event(event_id, &mut conn).await?)
    }
}

impl OrderFlowDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order_from_cart(
        &self,
        user_id: &str,
        request: NewOrderRequest,
        pricing: &PricingPolicy,
    ) -> Result<(Order, Vec<OrderItem>), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        db::begin_immediate(&mut conn).await?;
        let result = create_order_in_tx(user_id, &request, pricing, &mut conn).await;
        match result {
            Ok(created) => {
                db::commit(&mut conn).await?;
                debug!("🧾️ Order {} created for user {user_id}", created.0.order_number);
                Ok(created)
            },
            Err(e) => {
                db::rollback(&mut conn).await;
                Err(e)
            },
        }
    }

    async fn transition_order(&self, order_id: i64, new_status: OrderStatus) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        db::begin_immediate(&mut conn).await?;
        let result = transition_in_tx(order_id, new_status, &mut conn).await;
        match result {
            Ok(order) => {
                db::commit(&mut conn).await?;
                debug!("🧾️ Order {order_id} is now {new_status}");
                Ok(order)
            },
            Err(e) => {
                db::rollback(&mut conn).await;
                Err(e)
            },
        }
    }

    async fn apply_payment_event(&self, event: GatewayEvent) -> Result<WebhookOutcome, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        db::begin_immediate(&mut conn).await?;
        let result = apply_event_in_tx(&event, &mut conn).await;
        match result {
            Ok(outcome) => {
                db::commit(&mut conn).await?;
                Ok(outcome)
            },
            Err(e) => {
                db::rollback(&mut conn).await;
                Err(e)
            },
        }
    }

    async fn store_payment_intent(&self, order_id: i64, payment_intent_id: &str) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_payment_intent(order_id, payment_intent_id, &mut conn)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    async fn store_checkout_session(&self, order_id: i64, session_id: &str) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_checkout_session(order_id, session_id, &mut conn)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    async fn total_refunded(&self, order_id: i64) -> Result<Money, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(refunds::total_refunded(order_id, &mut conn).await?)
    }

    async fn record_refund(
        &self,
        order_id: i64,
        refund: NewRefund,
    ) -> Result<(Order, RefundRecord), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        db::begin_immediate(&mut conn).await?;
        let result = record_refund_in_tx(order_id, &refund, &mut conn).await;
        match result {
            Ok(recorded) => {
                db::commit(&mut conn).await?;
                Ok(recorded)
            },
            Err(e) => {
                db::rollback(&mut conn).await;
                Err(e)
            },
        }
    }

    async fn mark_refund_pending(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        db::begin_immediate(&mut conn).await?;
        let result = orders::mark_refund_pending(order_id, &mut conn).await;
        match result {
            Ok(Some(order)) => {
                db::commit(&mut conn).await?;
                Ok(order)
            },
            Ok(None) => {
                db::rollback(&mut conn).await;
                Err(OrderFlowError::OrderNotFound(order_id))
            },
            Err(e) => {
                db::rollback(&mut conn).await;
                Err(e.into())
            },
        }
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

async fn create_order_in_tx(
    user_id: &str,
    request: &NewOrderRequest,
    pricing: &PricingPolicy,
    conn: &mut SqliteConnection,
) -> Result<(Order, Vec<OrderItem>), OrderFlowError> {
    let lines = carts::snapshot_cart(user_id, &mut *conn).await?;
    if lines.is_empty() {
        return Err(OrderFlowError::EmptyCart(user_id.to_string()));
    }
    for line in &lines {
        if !line.active {
            return Err(OrderFlowError::ProductUnavailable(line.product_id));
        }
    }
    for line in &lines {
        products::reserve_stock(line.product_id, line.quantity, &mut *conn).await?;
    }
    let subtotal: Money = lines.iter().map(|l| l.unit_price * l.quantity).sum();
    let totals = pricing.quote(subtotal);
    let number = helpers::new_order_number();
    let order = orders::insert_order(user_id, &number, request, &totals, &mut *conn).await?;
    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        items.push(orders::insert_order_item(order.id, line, &mut *conn).await?);
    }
    carts::clear_cart(user_id, &mut *conn).await?;
    Ok((order, items))
}

async fn transition_in_tx(
    order_id: i64,
    new_status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let order =
        orders::fetch_order(order_id, &mut *conn).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
    let from = order.status;
    if !from.can_transition_to(new_status) {
        return Err(OrderFlowError::InvalidTransition { from, to: new_status });
    }
    let updated = orders::transition_with_guard(order_id, from, new_status, &mut *conn)
        .await?
        .ok_or(OrderFlowError::InvalidTransition { from, to: new_status })?;
    if new_status == OrderStatus::Cancelled {
        // The guarded update above fired at most once, so the stock comes back exactly once.
        let items = orders::fetch_order_items(order_id, &mut *conn).await?;
        for item in &items {
            products::release_stock(item.product_id, item.quantity, &mut *conn).await?;
        }
        debug!("↩️ Returned stock for {} items of cancelled order {order_id}", items.len());
    }
    Ok(updated)
}

async fn apply_event_in_tx(
    event: &GatewayEvent,
    conn: &mut SqliteConnection,
) -> Result<WebhookOutcome, OrderFlowError> {
    let fresh =
        payment_events::try_record(&event.event_id, event.order_id, &event.kind.to_string(), &mut *conn).await?;
    if !fresh {
        debug!("🔔️ Event {} has been applied before; acknowledging replay", event.event_id);
        return Ok(WebhookOutcome::AlreadyProcessed);
    }
    let Some(order_id) = event.order_id else {
        return Ok(WebhookOutcome::Ignored("the event carries no order correlation id".to_string()));
    };
    if orders::fetch_order(order_id, &mut *conn).await?.is_none() {
        return Ok(WebhookOutcome::Ignored(format!("order {order_id} does not exist")));
    }
    let updated = match &event.kind {
        GatewayEventKind::PaymentSucceeded | GatewayEventKind::CheckoutCompleted => {
            orders::complete_payment(order_id, event.amount, event.currency.as_deref(), &mut *conn).await?
        },
        GatewayEventKind::PaymentFailed => {
            orders::fail_payment(order_id, event.failure_reason.as_deref(), &mut *conn).await?
        },
        GatewayEventKind::CheckoutExpired => orders::expire_payment(order_id, &mut *conn).await?,
        GatewayEventKind::Other(kind) => {
            return Ok(WebhookOutcome::Ignored(format!("unrecognized event kind {kind}")));
        },
    };
    match updated {
        Some(order) => Ok(WebhookOutcome::Applied(order)),
        None => Ok(WebhookOutcome::Ignored("the payment already resolved; the event is superseded".to_string())),
    }
}

async fn record_refund_in_tx(
    order_id: i64,
    refund: &NewRefund,
    conn: &mut SqliteConnection,
) -> Result<(Order, RefundRecord), OrderFlowError> {
    let order =
        orders::fetch_order(order_id, &mut *conn).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
    let record = refunds::insert_refund(order_id, refund, &mut *conn).await?;
    let captured = order.captured_amount.unwrap_or(order.total);
    let refunded = refunds::total_refunded(order_id, &mut *conn).await?;
    let full = refunded >= captured;
    let updated = orders::apply_refund_outcome(order_id, full, &mut *conn)
        .await?
        .ok_or(OrderFlowError::OrderNotFound(order_id))?;
    Ok((updated, record))
}
