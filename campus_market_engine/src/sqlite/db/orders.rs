use chrono::Utc;
use log::{debug, trace, warn};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::products;
use crate::{
    db_types::{FullOrder, MicroUnits, NewOrder, Order, OrderId, OrderItem, OrderStatusType, PaymentUpdate},
    market_api::{
        errors::MarketError,
        order_objects::{OrderQueryFilter, Pagination},
    },
};

/// Reserves inventory for every line, then stores the order and its lines. This is not atomic. Embed the call in a
/// transaction and pass `&mut *tx` as the connection so a failing line rolls back the lines before it.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<FullOrder, MarketError> {
    let NewOrder { buyer, store_id, currency, items } = order;
    let mut priced = Vec::with_capacity(items.len());
    let mut amount = MicroUnits::from(0);
    for item in items {
        let product = products::reserve_inventory(store_id, item.product_id, item.quantity, conn).await?;
        let line_total = product.price.checked_mul(item.quantity).ok_or_else(|| {
            MarketError::validation(format!("Line total for product {} overflows", item.product_id))
        })?;
        amount = amount
            .checked_add(line_total)
            .ok_or_else(|| MarketError::validation("The order total overflows".to_string()))?;
        priced.push((item, product.price));
    }
    let now = Utc::now();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (buyer, store_id, currency, amount, status, withdrawn, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', 0, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(buyer)
    .bind(store_id)
    .bind(currency)
    .bind(amount)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    let mut lines = Vec::with_capacity(priced.len());
    for (line_no, (item, unit_price)) in priced.into_iter().enumerate() {
        let line: OrderItem = sqlx::query_as(
            r#"
                INSERT INTO order_items (order_id, line_no, product_id, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *;
            "#,
        )
        .bind(order.id)
        .bind(line_no as i64)
        .bind(item.product_id)
        .bind(unit_price)
        .bind(item.quantity)
        .fetch_one(&mut *conn)
        .await?;
        lines.push(line);
    }
    debug!("🗃️ Order {} for {} stored with {} lines", order.id, order.amount, lines.len());
    Ok(FullOrder { order, items: lines })
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_items(id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY line_no ASC")
        .bind(id)
        .fetch_all(conn)
        .await
}

/// `pending -> paid`, keyed on the transaction signature.
pub async fn mark_paid(
    id: OrderId,
    tx_signature: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentUpdate, MarketError> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'paid', tx_signature = $1, updated_at = $2
            WHERE id = $3 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(tx_signature)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(order) = updated {
        debug!("🗃️ Order {id} marked as paid with transaction {tx_signature}");
        return Ok(PaymentUpdate::Confirmed(order));
    }
    let order = fetch_order(id, conn).await?.ok_or(MarketError::OrderNotFound(id))?;
    match (order.status, order.tx_signature.as_deref()) {
        (OrderStatusType::Paid, Some(existing)) if existing == tx_signature => {
            trace!("🗃️ Order {id} was already paid with transaction {tx_signature}");
            Ok(PaymentUpdate::AlreadyConfirmed(order))
        },
        (OrderStatusType::Paid, Some(existing)) => {
            warn!("🗃️ Order {id} is already paid with {existing}, but {tx_signature} was submitted");
            Err(MarketError::PaymentConflict { order_id: id, existing: existing.to_string() })
        },
        (from, _) => Err(MarketError::InvalidOrderTransition { order_id: id, from, to: OrderStatusType::Paid }),
    }
}

/// Compare-and-swap on the order status. Fails with `InvalidOrderTransition` (reporting the status actually found) if
/// the order is no longer in `from`.
pub async fn update_status(
    id: OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketError> {
    let updated: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *")
            .bind(to)
            .bind(Utc::now())
            .bind(id)
            .bind(from)
            .fetch_optional(&mut *conn)
            .await?;
    match updated {
        Some(order) => {
            debug!("🗃️ Order {id} moved from {from} to {to}");
            Ok(order)
        },
        None => {
            let order = fetch_order(id, conn).await?.ok_or(MarketError::OrderNotFound(id))?;
            Err(MarketError::InvalidOrderTransition { order_id: id, from: order.status, to })
        },
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: OrderQueryFilter) {
    if filter.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(buyer) = filter.buyer {
        where_clause.push("buyer = ");
        where_clause.push_bind_unseparated(buyer);
    }
    if let Some(store_id) = filter.store_id {
        where_clause.push("store_id = ");
        where_clause.push_bind_unseparated(store_id);
    }
    if let Some(seller) = filter.seller {
        where_clause.push("store_id IN (SELECT id FROM stores WHERE owner_address = ");
        where_clause.push_bind_unseparated(seller);
        where_clause.push_unseparated(")");
    }
    if let Some(statuses) = filter.status {
        if statuses.is_empty() {
            where_clause.push("0 = 1");
        } else {
            where_clause.push("status IN (");
            for (i, status) in statuses.into_iter().enumerate() {
                if i > 0 {
                    where_clause.push_unseparated(", ");
                }
                where_clause.push_bind_unseparated(status);
            }
            where_clause.push_unseparated(")");
        }
    }
    if let Some(withdrawn) = filter.withdrawn {
        where_clause.push("withdrawn = ");
        where_clause.push_bind_unseparated(withdrawn);
    }
    if let Some(since) = filter.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`, newest first.
pub async fn search_orders(
    filter: OrderQueryFilter,
    pagination: Option<Pagination>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some(page) = pagination {
        builder.push(" LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

pub async fn count_orders(filter: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filter(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(conn).await
}
