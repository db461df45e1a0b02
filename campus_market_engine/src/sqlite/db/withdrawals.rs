use campus_common::FeeRate;
use chrono::Utc;
use log::{debug, trace, warn};
use sqlx::SqliteConnection;

use super::{orders, stores};
use crate::{
    db_types::{
        Address,
        Currency,
        MicroUnits,
        Order,
        OrderId,
        WithdrawalDetail,
        WithdrawalId,
        WithdrawalRequest,
        WithdrawalStatus,
    },
    market_api::errors::MarketError,
};

/// Sets `withdrawn` on a single order, on condition that it belongs to one of `seller`'s stores, is paid or
/// fulfilled, and has not been withdrawn yet. This is the only statement that ever sets the flag.
pub async fn claim_order(seller: &Address, id: OrderId, conn: &mut SqliteConnection) -> Result<Order, MarketError> {
    let claimed: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET withdrawn = 1, updated_at = $1
            WHERE id = $2
              AND withdrawn = 0
              AND status IN ('paid', 'fulfilled')
              AND store_id IN (SELECT id FROM stores WHERE owner_address = $3)
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .bind(seller)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(order) = claimed {
        trace!("🗃️ Order {id} claimed for withdrawal by {seller}");
        return Ok(order);
    }
    let order = orders::fetch_order(id, conn).await?.ok_or(MarketError::OrderNotFound(id))?;
    let owner = stores::fetch_store(order.store_id, conn).await?.map(|s| s.owner_address);
    if owner.as_ref() != Some(seller) {
        return Err(MarketError::forbidden(seller, format!("withdraw the revenue of order {id}")));
    }
    if order.withdrawn {
        return Err(MarketError::AlreadyWithdrawn(id));
    }
    if !order.status.is_settleable() {
        return Err(MarketError::OrderNotEligible(id));
    }
    Err(MarketError::InternalError(format!("Order {id} matched every withdrawal condition but was not claimed")))
}

/// Claims every order and records the request. This is not atomic on its own: run it in a transaction so that a
/// single failed claim releases the others.
pub async fn create_withdrawal(
    seller: &Address,
    order_ids: &[OrderId],
    fee_rate: FeeRate,
    notes: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalDetail, MarketError> {
    let mut currency: Option<Currency> = None;
    let mut amount = MicroUnits::from(0);
    for &id in order_ids {
        let order = claim_order(seller, id, conn).await?;
        match currency {
            None => currency = Some(order.currency),
            Some(c) if c != order.currency => {
                warn!("🗃️ Withdrawal for {seller} mixes {c} and {} (order {id})", order.currency);
                return Err(MarketError::MixedCurrency);
            },
            Some(_) => {},
        }
        amount = amount
            .checked_add(fee_rate.seller_revenue(order.amount))
            .ok_or_else(|| MarketError::validation("The withdrawal total overflows".to_string()))?;
    }
    let currency = currency.ok_or(MarketError::NoEligibleOrders)?;
    if !amount.is_positive() {
        return Err(MarketError::validation(format!("There is no seller revenue to withdraw at a {fee_rate} fee")));
    }
    let request: WithdrawalRequest = sqlx::query_as(
        r#"
            INSERT INTO withdrawal_requests (seller_address, amount, currency, status, requested_at, notes)
            VALUES ($1, $2, $3, 'requested', $4, $5)
            RETURNING *;
        "#,
    )
    .bind(seller)
    .bind(amount)
    .bind(currency)
    .bind(Utc::now())
    .bind(notes)
    .fetch_one(&mut *conn)
    .await?;
    for &order_id in order_ids {
        sqlx::query("INSERT INTO withdrawal_request_orders (withdrawal_id, order_id) VALUES ($1, $2)")
            .bind(request.id)
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🗃️ Withdrawal {} of {amount} {currency} recorded for {seller}", request.id);
    Ok(WithdrawalDetail { request, order_ids: order_ids.to_vec() })
}

pub async fn fetch_withdrawal_request(
    id: WithdrawalId,
    conn: &mut SqliteConnection,
) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM withdrawal_requests WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_withdrawal_order_ids(
    id: WithdrawalId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderId>, sqlx::Error> {
    sqlx::query_scalar("SELECT order_id FROM withdrawal_request_orders WHERE withdrawal_id = $1 ORDER BY order_id")
        .bind(id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_withdrawals_for_seller(
    seller: &Address,
    conn: &mut SqliteConnection,
) -> Result<Vec<WithdrawalRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM withdrawal_requests WHERE seller_address = $1 ORDER BY requested_at DESC, id DESC")
        .bind(seller)
        .fetch_all(conn)
        .await
}

/// Compare-and-swap on the request status. The current status must be one of `WithdrawalStatus::allowed_sources(to)`.
pub async fn update_status(
    id: WithdrawalId,
    to: WithdrawalStatus,
    tx_signature: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, MarketError> {
    let (from_a, from_b) = match WithdrawalStatus::allowed_sources(to) {
        [a] => (Some(*a), None),
        [a, b] => (Some(*a), Some(*b)),
        _ => (None, None),
    };
    let timestamp_column = match to {
        WithdrawalStatus::Completed => "completed_at = $1",
        _ => "processed_at = COALESCE(processed_at, $1)",
    };
    let sql = format!(
        "UPDATE withdrawal_requests SET status = $2, {timestamp_column}, tx_signature = COALESCE($3, tx_signature) \
         WHERE id = $4 AND status IN ($5, $6) RETURNING *"
    );
    let updated: Option<WithdrawalRequest> = match from_a {
        Some(a) => {
            sqlx::query_as(&sql)
                .bind(Utc::now())
                .bind(to)
                .bind(tx_signature)
                .bind(id)
                .bind(a)
                .bind(from_b.unwrap_or(a))
                .fetch_optional(&mut *conn)
                .await?
        },
        None => None,
    };
    match updated {
        Some(request) => {
            debug!("🗃️ Withdrawal {id} is now {to}");
            Ok(request)
        },
        None => {
            let request = fetch_withdrawal_request(id, conn).await?.ok_or(MarketError::WithdrawalNotFound(id))?;
            Err(MarketError::InvalidWithdrawalTransition { id, from: request.status, to })
        },
    }
}

/// Clears `withdrawn` on the orders of a failed request. Orders that a live (not failed) request has claimed in the
/// meantime keep their flag, which makes the call safe to repeat.
pub async fn release_orders(id: WithdrawalId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET withdrawn = 0, updated_at = $1
            WHERE withdrawn = 1
              AND id IN (
                SELECT wro.order_id FROM withdrawal_request_orders wro
                JOIN withdrawal_requests wr ON wr.id = wro.withdrawal_id
                WHERE wr.id = $2 AND wr.status = 'failed'
              )
              AND NOT EXISTS (
                SELECT 1 FROM withdrawal_request_orders other
                JOIN withdrawal_requests live ON live.id = other.withdrawal_id
                WHERE other.order_id = orders.id AND live.status <> 'failed'
              );
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    debug!("🗃️ {} orders of withdrawal {id} released", result.rows_affected());
    Ok(result.rows_affected())
}
