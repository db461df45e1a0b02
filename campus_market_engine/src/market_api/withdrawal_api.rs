use std::fmt::Debug;

use campus_common::FeeRate;
use log::*;

use crate::{
    db_types::{
        Address,
        Order,
        OrderId,
        OrderStatusType,
        WithdrawalDetail,
        WithdrawalId,
        WithdrawalRequest,
        WithdrawalStatus,
    },
    market_api::{auth_gate::AuthorizationGate, errors::MarketError, order_objects::OrderQueryFilter},
    traits::MarketplaceDatabase,
};

/// `WithdrawalApi` settles a seller's paid orders into withdrawal requests.
///
/// An order can be claimed by at most one live request. The claim is a conditional write inside the same transaction
/// that records the request, so two concurrent requests for the same order cannot both succeed.
pub struct WithdrawalApi<B> {
    db: B,
    gate: AuthorizationGate<B>,
    fee_rate: FeeRate,
}

impl<B> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi ({})", self.fee_rate)
    }
}

impl<B> WithdrawalApi<B> {
    pub fn new(db: B, gate: AuthorizationGate<B>, fee_rate: FeeRate) -> Self {
        Self { db, gate, fee_rate }
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }
}

impl<B> WithdrawalApi<B>
where B: MarketplaceDatabase
{
    /// Paid or fulfilled orders of the seller's stores that have not been withdrawn yet, newest first.
    pub async fn list_eligible_orders(&self, seller: &Address) -> Result<Vec<Order>, MarketError> {
        let filter = OrderQueryFilter::default()
            .with_seller(seller.clone())
            .with_status(OrderStatusType::Paid)
            .with_status(OrderStatusType::Fulfilled)
            .with_withdrawn(false);
        self.db.search_orders(filter, None).await
    }

    /// Claims `order_ids` for `seller` and records a withdrawal request for the sum of their seller revenue.
    ///
    /// Every order is re-validated at claim time. If any of them was claimed since the seller listed it, the request
    /// fails with `AlreadyWithdrawn` and no order is claimed.
    pub async fn create_withdrawal_request(
        &self,
        seller: &Address,
        order_ids: &[OrderId],
        notes: Option<String>,
    ) -> Result<WithdrawalDetail, MarketError> {
        let mut ids = Vec::with_capacity(order_ids.len());
        for id in order_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        if ids.is_empty() {
            return Err(MarketError::NoEligibleOrders);
        }
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let detail = self.db.claim_orders_for_withdrawal(seller, &ids, self.fee_rate, notes).await.map_err(|e| {
            warn!("🔄️💸️ Withdrawal request by {seller} for {} orders rejected. {e}", ids.len());
            e
        })?;
        info!(
            "🔄️💸️ Withdrawal {} of {} {} requested by {seller} for {} orders",
            detail.request.id,
            detail.request.amount,
            detail.request.currency,
            detail.order_ids.len()
        );
        Ok(detail)
    }

    /// Moves a request along `requested -> processing -> completed`, or to `failed` from either non-terminal state.
    ///
    /// When a request fails, its orders are released so the seller can claim them again. The release runs after the
    /// status change is committed. If it fails, the error is logged and the status change still stands; call
    /// [`Self::release_failed_withdrawal`] to retry it.
    pub async fn advance_status(
        &self,
        id: WithdrawalId,
        new_status: WithdrawalStatus,
        tx_signature: Option<&str>,
    ) -> Result<WithdrawalRequest, MarketError> {
        let tx_signature = tx_signature.map(str::trim).filter(|s| !s.is_empty());
        let request = self.db.update_withdrawal_status(id, new_status, tx_signature).await.map_err(|e| {
            warn!("🔄️💸️ Could not move withdrawal {id} to {new_status}. {e}");
            e
        })?;
        info!("🔄️💸️ Withdrawal {id} is now {new_status}");
        if new_status == WithdrawalStatus::Failed {
            match self.db.release_withdrawn_orders(id).await {
                Ok(n) => debug!("🔄️💸️ {n} orders of failed withdrawal {id} are eligible again"),
                Err(e) => error!(
                    "🔄️💸️ Withdrawal {id} failed, but its orders could not be released. Retry with \
                     release_failed_withdrawal. {e}"
                ),
            }
        }
        Ok(request)
    }

    /// Releases the orders of a failed request. Safe to call repeatedly. Returns the number of orders released.
    pub async fn release_failed_withdrawal(&self, id: WithdrawalId) -> Result<u64, MarketError> {
        let detail = self.db.fetch_withdrawal(id).await?.ok_or(MarketError::WithdrawalNotFound(id))?;
        if detail.request.status != WithdrawalStatus::Failed {
            return Err(MarketError::validation(format!(
                "Only failed withdrawals can release their orders. Withdrawal {id} is {}",
                detail.request.status
            )));
        }
        let released = self.db.release_withdrawn_orders(id).await?;
        info!("🔄️💸️ {released} orders of failed withdrawal {id} released");
        Ok(released)
    }

    /// The seller's requests, most recently requested first.
    pub async fn list_history(&self, seller: &Address) -> Result<Vec<WithdrawalRequest>, MarketError> {
        self.db.fetch_withdrawals_for_seller(seller).await
    }

    /// A request with its order ids. Visible to the seller who made it and to administrators.
    pub async fn fetch_withdrawal(&self, caller: &Address, id: WithdrawalId) -> Result<WithdrawalDetail, MarketError> {
        let detail = self.db.fetch_withdrawal(id).await?.ok_or(MarketError::WithdrawalNotFound(id))?;
        if &detail.request.seller_address != caller && !self.gate.is_admin(caller) {
            return Err(MarketError::forbidden(caller, format!("view withdrawal {id}")));
        }
        Ok(detail)
    }
}
