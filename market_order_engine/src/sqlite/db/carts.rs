use log::debug;
use mos_common::Money;
use sqlx::{FromRow, SqliteConnection};

use crate::{db_types::CartLine, traits::OrderFlowError};

/// A cart line joined with the product flags the order flow needs at checkout time.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct CartSnapshotLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub active: bool,
}

/// Reads the user's cart as an immutable snapshot, price-locked to the values captured when each line was
/// added.
pub(crate) async fn snapshot_cart(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<CartSnapshotLine>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT ci.product_id AS product_id, ci.quantity AS quantity, ci.unit_price AS unit_price, p.active AS active
        FROM cart_items ci JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.product_id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

pub async fn cart_lines(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, sqlx::Error> {
    sqlx::query_as(
        "SELECT product_id, quantity, unit_price FROM cart_items WHERE user_id = $1 ORDER BY product_id",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

/// Sets a cart line for the user, snapshotting the product's current price. Replaces an existing line for
/// the same product.
pub async fn upsert_line(
    user_id: &str,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    let result = sqlx::query(
        r#"
        INSERT INTO cart_items (user_id, product_id, quantity, unit_price)
        SELECT $1, id, $3, price FROM products WHERE id = $2
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = excluded.quantity, unit_price = excluded.unit_price
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(OrderFlowError::ProductUnavailable(product_id));
    }
    Ok(())
}

pub(crate) async fn clear_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    debug!("🛒️ Cleared {} cart lines for user {user_id}", result.rows_affected());
    Ok(result.rows_affected())
}
