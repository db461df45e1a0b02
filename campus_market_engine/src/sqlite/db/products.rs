use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, OrderId, Product, ProductId, ProductUpdate, StoreId},
    market_api::errors::MarketError,
};

pub async fn insert_product(
    store_id: StoreId,
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (store_id, name, category, price, inventory, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(store_id)
    .bind(product.name)
    .bind(product.category)
    .bind(product.price)
    .bind(product.inventory)
    .bind(product.image)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product {} added to store {store_id}", product.id);
    Ok(product)
}

pub async fn fetch_product(id: ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_products_for_store(
    store_id: StoreId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE store_id = $1 ORDER BY id ASC").bind(store_id).fetch_all(conn).await
}

pub async fn update_product(
    id: ProductId,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(name) = update.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(category) = update.category {
        builder.push(", category = ");
        builder.push_bind(category);
    }
    if let Some(price) = update.price {
        builder.push(", price = ");
        builder.push_bind(price);
    }
    if let Some(inventory) = update.inventory {
        builder.push(", inventory = ");
        builder.push_bind(inventory);
    }
    if let Some(image) = update.image {
        builder.push(", image = ");
        builder.push_bind(image);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Product>().fetch_optional(conn).await
}

pub async fn delete_product(id: ProductId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Takes `quantity` units of a product of `store_id` out of inventory. The decrement only happens if enough stock is
/// left, so concurrent orders can never oversell.
pub async fn reserve_inventory(
    store_id: StoreId,
    product_id: ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, MarketError> {
    let reserved: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET inventory = inventory - $1, updated_at = $2
            WHERE id = $3 AND store_id = $4 AND inventory >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(product) = reserved {
        trace!("🗃️ Reserved {quantity} of product {product_id}. {} left", product.inventory);
        return Ok(product);
    }
    match fetch_product(product_id, conn).await? {
        Some(product) if product.store_id == store_id => Err(MarketError::InsufficientInventory {
            product_id,
            requested: quantity,
            available: product.inventory,
        }),
        _ => Err(MarketError::ProductNotFound(product_id)),
    }
}

/// Returns the quantities reserved by an order's lines to their products. Lines whose product has since been deleted
/// are skipped. Returns the number of products restocked.
pub async fn restock_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE products SET
                inventory = inventory + (
                    SELECT SUM(quantity) FROM order_items WHERE order_id = $1 AND product_id = products.id
                ),
                updated_at = $2
            WHERE id IN (SELECT product_id FROM order_items WHERE order_id = $1);
        "#,
    )
    .bind(order_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    debug!("🗃️ Restocked {} products from order {order_id}", result.rows_affected());
    Ok(result.rows_affected())
}
