//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction and pass `&mut *tx` through to the
//! functions without any other changes.
//!
//! SQLite has no `SELECT ... FOR UPDATE`. Functions named `claim_*` are the substitute: they are a conditional
//! `UPDATE ... RETURNING *`, and must be the first statement of the transaction they run in. That takes the database
//! write lock before anything is read, and the guard in the `WHERE` clause is evaluated against committed state.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod catalog;
pub mod ledger;
pub mod logs;
pub mod orders;
pub mod payments;
pub mod refunds;
pub mod settlement;

const SQLITE_DB_URL: &str = "sqlite://data/market_store.db";

pub fn db_url() -> String {
    let result = env::var("MKT_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ MKT_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
