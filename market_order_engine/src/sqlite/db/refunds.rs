use log::debug;
use mos_common::Money;
use sqlx::SqliteConnection;

use crate::db_types::{NewRefund, RefundRecord};

pub(crate) async fn insert_refund(
    order_id: i64,
    refund: &NewRefund,
    conn: &mut SqliteConnection,
) -> Result<RefundRecord, sqlx::Error> {
    let record: RefundRecord = sqlx::query_as(
        r#"
            INSERT INTO refunds (order_id, refund_id, amount, reason, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(&refund.refund_id)
    .bind(refund.amount)
    .bind(&refund.reason)
    .bind(&refund.status)
    .fetch_one(conn)
    .await?;
    debug!("💸️ Refund {} of {} recorded against order {order_id}", record.refund_id, record.amount);
    Ok(record)
}

pub(crate) async fn total_refunded(order_id: i64, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let cents: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM refunds WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(conn)
        .await?;
    Ok(Money::from_cents(cents))
}

pub async fn fetch_refunds(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<RefundRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM refunds WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}
