use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Address, NewPointsEntry, PointsLedgerEntry},
    market_api::order_objects::Pagination,
};

pub async fn insert_entry(
    entry: NewPointsEntry,
    conn: &mut SqliteConnection,
) -> Result<PointsLedgerEntry, sqlx::Error> {
    let entry: PointsLedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO points_log (address, delta, reason, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(entry.address)
    .bind(entry.delta)
    .bind(entry.reason)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Points entry {} ({:+}) appended for {}", entry.id, entry.delta, entry.address);
    Ok(entry)
}

/// The running total, aggregated from the log.
pub async fn total_for_address(address: &Address, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(SUM(delta), 0) FROM points_log WHERE address = $1")
        .bind(address)
        .fetch_one(conn)
        .await
}

pub async fn history_for_address(
    address: &Address,
    pagination: Option<Pagination>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PointsLedgerEntry>, sqlx::Error> {
    let pagination = pagination.unwrap_or(Pagination::new(0, -1));
    sqlx::query_as(
        r#"
            SELECT * FROM points_log WHERE address = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3;
        "#,
    )
    .bind(address)
    .bind(pagination.limit)
    .bind(pagination.offset)
    .fetch_all(conn)
    .await
}
