use campus_common::FeeRate;

use crate::{
    db_types::{Address, OrderId, WithdrawalDetail, WithdrawalId, WithdrawalRequest, WithdrawalStatus},
    market_api::errors::MarketError,
};

/// Persistence for seller withdrawal requests.
#[allow(async_fn_in_trait)]
pub trait WithdrawalManagement {
    /// In a single atomic transaction, claims every order in `order_ids` for `seller` and records a new withdrawal
    /// request in the `Requested` state.
    ///
    /// Each order is claimed with a conditional write that only succeeds while the order belongs to one of the
    /// seller's stores, is `Paid` or `Fulfilled`, and is not yet withdrawn. If any claim fails, or the orders do not
    /// share a currency, the whole transaction is rolled back. The request amount is the sum of
    /// `fee_rate.seller_revenue` over the claimed orders.
    async fn claim_orders_for_withdrawal(
        &self,
        seller: &Address,
        order_ids: &[OrderId],
        fee_rate: FeeRate,
        notes: Option<String>,
    ) -> Result<WithdrawalDetail, MarketError>;

    async fn fetch_withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalDetail>, MarketError>;

    /// Moves a request to `to`, provided its current state is one of [`WithdrawalStatus::allowed_sources`]. The
    /// transaction signature is recorded when supplied.
    async fn update_withdrawal_status(
        &self,
        id: WithdrawalId,
        to: WithdrawalStatus,
        tx_signature: Option<&str>,
    ) -> Result<WithdrawalRequest, MarketError>;

    /// Clears the withdrawn flag on the orders of a *failed* request so they can be claimed again. Orders that have
    /// since been claimed by another live request are left alone. Returns the number of orders released.
    async fn release_withdrawn_orders(&self, id: WithdrawalId) -> Result<u64, MarketError>;

    /// Requests for `seller`, most recently requested first.
    async fn fetch_withdrawals_for_seller(&self, seller: &Address) -> Result<Vec<WithdrawalRequest>, MarketError>;
}
