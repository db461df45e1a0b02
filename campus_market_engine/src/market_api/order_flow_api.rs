use std::fmt::Debug;

use campus_common::{FeeRate, MicroUnits};
use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{
        Address,
        Currency,
        FullOrder,
        NewOrder,
        NewOrderItem,
        Order,
        OrderId,
        OrderStatusType,
        PaymentUpdate,
        StoreId,
    },
    market_api::{
        auth_gate::AuthorizationGate,
        errors::MarketError,
        order_objects::{OrderQueryFilter, Page, Pagination, TransactionReport},
    },
    traits::MarketplaceDatabase,
};

pub const MAX_REPORT_ROWS: i64 = 1_000;
pub const MAX_REPORT_DAYS: i64 = 3_650;

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, payment confirmation, seller fulfilment and
/// the admin transaction report.
///
/// Fees are never stored. They are derived from the order amount with the `FeeRate` this API was built with, which
/// must be the same instance handed to [`crate::WithdrawalApi`].
pub struct OrderFlowApi<B> {
    db: B,
    gate: AuthorizationGate<B>,
    fee_rate: FeeRate,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.fee_rate)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, gate: AuthorizationGate<B>, fee_rate: FeeRate) -> Self {
        Self { db, gate, fee_rate }
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    pub fn platform_fee(&self, order: &Order) -> MicroUnits {
        self.fee_rate.platform_fee(order.amount)
    }

    pub fn seller_revenue(&self, order: &Order) -> MicroUnits {
        self.fee_rate.seller_revenue(order.amount)
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Places a new order for `buyer`.
    ///
    /// Every line must reference a product of `store_id` with enough inventory. Unit prices are captured from the
    /// products as they are now, and the order amount is the sum of the lines. Either the whole order is stored, or
    /// nothing is.
    pub async fn create_order(
        &self,
        buyer: &Address,
        store_id: StoreId,
        items: Vec<NewOrderItem>,
        currency: Currency,
    ) -> Result<FullOrder, MarketError> {
        if items.is_empty() {
            return Err(MarketError::validation("An order needs at least one item"));
        }
        if let Some(item) = items.iter().find(|i| i.quantity < 1) {
            return Err(MarketError::validation(format!(
                "Quantity for product {} must be at least 1, got {}",
                item.product_id, item.quantity
            )));
        }
        let order = NewOrder { buyer: buyer.clone(), store_id, currency, items };
        let order = self.db.insert_order(order).await.map_err(|e| {
            debug!("🔄️📦️ Order for {buyer} at store {store_id} rejected. {e}");
            e
        })?;
        info!(
            "🔄️📦️ Order {} placed by {buyer} at store {store_id} for {} {currency}",
            order.order.id, order.order.amount
        );
        Ok(order)
    }

    /// Records the payment transaction for an order, moving it from `Pending` to `Paid`.
    ///
    /// The signature acts as an idempotency key: confirming again with the same signature changes nothing and
    /// returns [`PaymentUpdate::AlreadyConfirmed`], while a different signature is a `PaymentConflict`.
    pub async fn confirm_payment(&self, order_id: OrderId, tx_signature: &str) -> Result<PaymentUpdate, MarketError> {
        let tx_signature = tx_signature.trim();
        if tx_signature.is_empty() {
            return Err(MarketError::validation("A payment needs a transaction signature"));
        }
        let update = self.db.mark_order_paid(order_id, tx_signature).await?;
        match &update {
            PaymentUpdate::Confirmed(order) => {
                info!("🔄️💰️ Order {order_id} paid ({} {}) with {tx_signature}", order.amount, order.currency)
            },
            PaymentUpdate::AlreadyConfirmed(_) => {
                debug!("🔄️💰️ Payment {tx_signature} for order {order_id} was already recorded")
            },
        }
        Ok(update)
    }

    /// The seller of the order's store marks a paid order as fulfilled or cancelled.
    ///
    /// Ownership is checked before anything else, so a stranger gets `Forbidden` whatever the target status.
    /// Cancelling returns the reserved stock to inventory.
    pub async fn update_status(
        &self,
        caller: &Address,
        order_id: OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, MarketError> {
        let (order, _) = self.gate.require_order_store_owner(caller, order_id).await?;
        let seller_move = matches!(new_status, OrderStatusType::Fulfilled | OrderStatusType::Cancelled);
        if !seller_move || !order.status.can_transition_to(new_status) {
            warn!("🔄️📦️ {caller} tried to move order {order_id} from {} to {new_status}", order.status);
            return Err(MarketError::InvalidOrderTransition { order_id, from: order.status, to: new_status });
        }
        let order = self.db.update_order_status(order_id, order.status, new_status).await?;
        info!("🔄️📦️ Order {order_id} is now {new_status}");
        Ok(order)
    }

    /// The buyer's orders, newest first, with the exact total for pagination.
    pub async fn list_for_buyer(
        &self,
        buyer: &Address,
        statuses: Option<Vec<OrderStatusType>>,
        pagination: Pagination,
    ) -> Result<Page<Order>, MarketError> {
        pagination.validate()?;
        let mut filter = OrderQueryFilter::default().with_buyer(buyer.clone());
        filter.status = statuses;
        self.db.fetch_order_page(filter, pagination).await
    }

    /// Orders placed with a store, newest first.
    pub async fn list_for_seller_store(&self, store_id: StoreId) -> Result<Vec<Order>, MarketError> {
        self.db.fetch_store(store_id).await?.ok_or(MarketError::StoreNotFound(store_id))?;
        let filter = OrderQueryFilter::default().with_store_id(store_id);
        self.db.search_orders(filter, None).await
    }

    /// The order with its lines, in line order.
    pub async fn fetch_order(&self, order_id: OrderId) -> Result<FullOrder, MarketError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(MarketError::OrderNotFound(order_id))?;
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(FullOrder { order, items })
    }

    /// Per-order fee breakdown for orders created in the last `days` days, newest first. Administrators only.
    pub async fn transaction_report(
        &self,
        caller: &Address,
        days: i64,
        limit: i64,
    ) -> Result<TransactionReport, MarketError> {
        self.gate.require_admin(caller)?;
        if !(1..=MAX_REPORT_DAYS).contains(&days) {
            return Err(MarketError::validation(format!(
                "The report range must be between 1 and {MAX_REPORT_DAYS} days, got {days}"
            )));
        }
        if !(1..=MAX_REPORT_ROWS).contains(&limit) {
            return Err(MarketError::validation(format!(
                "The report row limit must be between 1 and {MAX_REPORT_ROWS}, got {limit}"
            )));
        }
        let since = Utc::now() - Duration::days(days);
        let filter = OrderQueryFilter::default().since(since);
        let orders = self.db.search_orders(filter, Some(limit)).await?;
        debug!("🔄️📊️ Transaction report for {caller}: {} orders since {since}", orders.len());
        Ok(TransactionReport::new(since, &self.fee_rate, &orders))
    }
}
