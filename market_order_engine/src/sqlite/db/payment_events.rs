use sqlx::SqliteConnection;

use crate::db_types::PaymentEvent;

/// Records the dedup row for a gateway event. Returns `false` when a row with the same event id already
/// exists, i.e. the event has been applied before.
pub(crate) async fn try_record(
    event_id: &str,
    order_id: Option<i64>,
    kind: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO payment_events (event_id, order_id, kind) VALUES ($1, $2, $3) ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(order_id)
    .bind(kind)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_event(
    event_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentEvent>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_events WHERE event_id = $1").bind(event_id).fetch_optional(conn).await
}
