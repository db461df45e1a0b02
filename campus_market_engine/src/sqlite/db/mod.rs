//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open an atomic transaction as the need arises and call
//! through to the functions without any other changes.
//!
//! Functions that change state are written as conditional updates. They never read a value, decide in Rust, and
//! write it back. When a conditional update touches no rows, the caller re-reads the row to report *why*.
use std::str::FromStr;

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod orders;
pub mod points;
pub mod products;
pub mod profiles;
pub mod stores;
pub mod withdrawals;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    info!("🗃️ Connection pool ready ({max_connections} connections max)");
    Ok(pool)
}
