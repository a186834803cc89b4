use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product},
    traits::OrderFlowError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (seller_id, name, description, price, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(product.seller_id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.stock)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await
}

/// Reserves `quantity` units of a product with a single conditional decrement. The `stock >= quantity`
/// predicate is what makes two concurrent reservations against the last unit mutually exclusive: exactly one
/// of them matches a row.
pub async fn reserve_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND stock >= $1",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(OrderFlowError::InsufficientStock { product_id, requested: quantity });
    }
    debug!("📦️ Reserved {quantity} units of product {product_id}");
    Ok(())
}

/// Returns `quantity` units to the shelf. Releases have no upper bound and always succeed.
pub async fn release_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    sqlx::query("UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(quantity)
        .bind(product_id)
        .execute(conn)
        .await?;
    debug!("📦️ Released {quantity} units of product {product_id}");
    Ok(())
}

pub async fn set_stock(product_id: i64, stock: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET stock = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(stock)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_active(product_id: i64, active: bool, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET active = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(active)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}
