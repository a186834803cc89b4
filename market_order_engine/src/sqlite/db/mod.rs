//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions for the order engine.
//!
//! All interactions are plain functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers obtain a connection from the pool, or open a write transaction
//! as the need arises, and call through without any other changes.

use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqliteConnection,
    SqlitePool,
};

pub mod carts;
pub mod orders;
pub mod payment_events;
pub mod products;
pub mod refunds;

const SQLITE_DB_URL: &str = "sqlite://data/market_store.db";

pub fn db_url() -> String {
    let result = env::var("MOS_DATABASE_URL").unwrap_or_else(|_| {
        info!("MOS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10))
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

// SQLite upgrades a deferred transaction's lock lazily, which can fail with SQLITE_BUSY when a competing
// writer commits first. The money- and stock-moving flows therefore take the write lock up front with
// BEGIN IMMEDIATE, so concurrent order placement queues on the busy timeout instead of failing.

pub(crate) async fn begin_immediate(conn: &mut SqliteConnection) -> Result<(), SqlxError> {
    sqlx::query("BEGIN IMMEDIATE").execute(conn).await.map(|_| ())
}

pub(crate) async fn commit(conn: &mut SqliteConnection) -> Result<(), SqlxError> {
    sqlx::query("COMMIT").execute(conn).await.map(|_| ())
}

pub(crate) async fn rollback(conn: &mut SqliteConnection) {
    let _ = sqlx::query("ROLLBACK").execute(conn).await;
}
