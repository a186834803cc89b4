use log::{debug, trace};
use mos_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrderRequest, Order, OrderItem, OrderNumber, OrderStatus},
    helpers::OrderTotals,
    sqlite::db::carts::CartSnapshotLine,
    traits::OrderFlowError,
};

pub(crate) async fn insert_order(
    user_id: &str,
    number: &OrderNumber,
    request: &NewOrderRequest,
    totals: &OrderTotals,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                subtotal,
                tax,
                shipping,
                total,
                street,
                city,
                state,
                zip_code,
                country,
                payment_method,
                notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(number.as_str())
    .bind(user_id)
    .bind(totals.subtotal)
    .bind(totals.tax)
    .bind(totals.shipping)
    .bind(totals.total)
    .bind(&request.shipping_address.street)
    .bind(&request.shipping_address.city)
    .bind(&request.shipping_address.state)
    .bind(&request.shipping_address.zip_code)
    .bind(&request.shipping_address.country)
    .bind(&request.payment_method)
    .bind(&request.notes)
    .fetch_one(conn)
    .await?;
    debug!("🧾️ Order {} inserted with id {}", order.order_number, order.id);
    Ok(order)
}

pub(crate) async fn insert_order_item(
    order_id: i64,
    line: &CartSnapshotLine,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, OrderFlowError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, quantity, price, total)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.unit_price * line.quantity)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(number.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_by_payment_intent(
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE payment_intent_id = $1")
        .bind(payment_intent_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

pub async fn order_contains_seller(
    order_id: i64,
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = $1 AND p.seller_id = $2
        "#,
    )
    .bind(order_id)
    .bind(seller_id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// Moves the order to `new_status`, guarded on the expected current status so a concurrent transition on the
/// same edge can win at most once. Entering `Shipped`/`Delivered` stamps the matching timestamp.
pub(crate) async fn transition_with_guard(
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let stamp = match to {
        OrderStatus::Shipped => ", shipped_at = CURRENT_TIMESTAMP",
        OrderStatus::Delivered => ", delivered_at = CURRENT_TIMESTAMP",
        _ => "",
    };
    let sql = format!(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP{stamp} WHERE id = $2 AND status = $3 \
         RETURNING *"
    );
    let result: Option<Order> = sqlx::query_as(&sql)
        .bind(to.to_string())
        .bind(order_id)
        .bind(from.to_string())
        .fetch_optional(conn)
        .await?;
    trace!("🧾️ Transition {from} -> {to} on order {order_id}: {}", if result.is_some() { "applied" } else { "lost" });
    Ok(result)
}

pub(crate) async fn set_payment_intent(
    order_id: i64,
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET payment_intent_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(payment_intent_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn set_checkout_session(
    order_id: i64,
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET checkout_session_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(session_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await
}

/// Resolves a pending payment as captured. The `payment_status = 'Pending'` guard is the forward-only rule:
/// an event arriving after the payment already resolved matches no row and the order is left untouched.
/// A pending order moves to `Processing` in the same statement.
pub(crate) async fn complete_payment(
    order_id: i64,
    amount: Option<Money>,
    currency: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE orders SET
            payment_status = 'Completed',
            status = CASE WHEN status = 'Pending' THEN 'Processing' ELSE status END,
            captured_amount = COALESCE($2, total),
            captured_currency = $3,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND payment_status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .bind(currency)
    .fetch_optional(conn)
    .await
}

/// Records a failed payment attempt. The order itself stays `Pending` so the user can retry.
pub(crate) async fn fail_payment(
    order_id: i64,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE orders SET payment_status = 'Failed', failure_reason = $2, updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND payment_status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(reason)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn expire_payment(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE orders SET payment_status = 'Expired', updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND payment_status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await
}

/// Stamps the refund outcome on the order. A fully consumed capture marks the payment `Refunded` and moves a
/// `Delivered` order to order-status `Refunded`; anything less is `PartiallyRefunded`.
pub(crate) async fn apply_refund_outcome(
    order_id: i64,
    full: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = if full {
        r#"
        UPDATE orders SET
            refund_status = 'Refunded',
            payment_status = 'Refunded',
            status = CASE WHEN status = 'Delivered' THEN 'Refunded' ELSE status END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
        RETURNING *
        "#
    } else {
        r#"
        UPDATE orders SET refund_status = 'PartiallyRefunded', updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
        RETURNING *
        "#
    };
    sqlx::query_as(sql).bind(order_id).fetch_optional(conn).await
}

pub(crate) async fn mark_refund_pending(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET refund_status = 'RefundPending', updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await
}
