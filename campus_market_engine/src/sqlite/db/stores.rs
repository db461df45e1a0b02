use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Address, NewStore, Store, StoreId, StoreUpdate},
    geohash::GeohashPrefix,
};

pub async fn insert_store(
    owner: &Address,
    store: NewStore,
    geohash: String,
    conn: &mut SqliteConnection,
) -> Result<Store, sqlx::Error> {
    let now = Utc::now();
    let store: Store = sqlx::query_as(
        r#"
            INSERT INTO stores (
                owner_address,
                name,
                category,
                description,
                latitude,
                longitude,
                geohash,
                banner,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *;
        "#,
    )
    .bind(owner)
    .bind(store.name)
    .bind(store.category)
    .bind(store.description)
    .bind(store.latitude)
    .bind(store.longitude)
    .bind(geohash)
    .bind(store.banner)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Store {} created for {owner} in cell {}", store.id, store.geohash);
    Ok(store)
}

pub async fn fetch_store(id: StoreId, conn: &mut SqliteConnection) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stores WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_stores_for_owner(owner: &Address, conn: &mut SqliteConnection) -> Result<Vec<Store>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stores WHERE owner_address = $1 ORDER BY created_at DESC, id DESC")
        .bind(owner)
        .fetch_all(conn)
        .await
}

pub async fn update_store(
    id: StoreId,
    update: StoreUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Store>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE stores SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(name) = update.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(category) = update.category {
        builder.push(", category = ");
        builder.push_bind(category);
    }
    if let Some(description) = update.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(banner) = update.banner {
        builder.push(", banner = ");
        builder.push_bind(banner);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Store>().fetch_optional(conn).await
}

pub async fn update_store_location(
    id: StoreId,
    latitude: f64,
    longitude: f64,
    geohash: String,
    conn: &mut SqliteConnection,
) -> Result<Option<Store>, sqlx::Error> {
    let store: Option<Store> = sqlx::query_as(
        r#"
            UPDATE stores SET latitude = $1, longitude = $2, geohash = $3, updated_at = $4
            WHERE id = $5
            RETURNING *;
        "#,
    )
    .bind(latitude)
    .bind(longitude)
    .bind(geohash)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    if let Some(store) = &store {
        debug!("🗃️ Store {} moved to cell {}", store.id, store.geohash);
    }
    Ok(store)
}

/// Range scan over the geohash index. Results are ordered by geohash and then id, so they are stable between calls.
pub async fn search_by_geohash(
    prefix: &GeohashPrefix,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Store>, sqlx::Error> {
    let (start, end) = prefix.range();
    let mut builder = QueryBuilder::new("SELECT * FROM stores WHERE geohash >= ");
    builder.push_bind(start);
    if let Some(end) = end {
        builder.push(" AND geohash < ");
        builder.push_bind(end);
    }
    builder.push(" ORDER BY geohash ASC, id ASC LIMIT ");
    builder.push_bind(limit);
    trace!("🗃️ Executing query: {}", builder.sql());
    let stores = builder.build_query_as::<Store>().fetch_all(conn).await?;
    trace!("🗃️ {} stores found in cell {prefix}", stores.len());
    Ok(stores)
}
