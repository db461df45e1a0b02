use crate::{
    db_types::{FullOrder, NewOrder, Order, OrderId, OrderItem, OrderStatusType, PaymentUpdate},
    market_api::{
        errors::MarketError,
        order_objects::{OrderQueryFilter, Page, Pagination},
    },
};

/// Persistence for orders and their lines.
///
/// Every state change is conditional on the state the caller observed, so two concurrent writers can never both
/// succeed.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Takes a new order, and in a single atomic transaction:
    /// * checks every line references a product of `order.store_id`,
    /// * reserves the requested quantity from each product's inventory,
    /// * captures each product's current price on its line,
    /// * stores the order with `amount` equal to the sum of the lines, status `Pending` and `withdrawn = false`.
    ///
    /// Nothing is persisted if any line fails.
    async fn insert_order(&self, order: NewOrder) -> Result<FullOrder, MarketError>;

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketError>;

    /// The lines of an order, in the order they were submitted.
    async fn fetch_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, MarketError>;

    /// Records `tx_signature` and moves the order from `Pending` to `Paid`.
    ///
    /// Re-submitting the signature already on a paid order is a no-op. Any other state, or a different signature, is
    /// an error.
    async fn mark_order_paid(&self, id: OrderId, tx_signature: &str) -> Result<PaymentUpdate, MarketError>;

    /// Moves the order from `from` to `to`, but only if it is still in `from`.
    ///
    /// Cancelling returns the reserved quantities to inventory in the same transaction.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Order, MarketError>;

    /// Matching orders, newest first, optionally capped at `limit` rows.
    async fn search_orders(&self, filter: OrderQueryFilter, limit: Option<i64>) -> Result<Vec<Order>, MarketError>;

    /// One page of matching orders, newest first, together with the exact total.
    async fn fetch_order_page(&self, filter: OrderQueryFilter, pagination: Pagination)
        -> Result<Page<Order>, MarketError>;
}
