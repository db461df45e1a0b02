use std::fmt::Display;

use campus_common::{FeeRate, MicroUnits};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Address, Currency, Order, OrderId, OrderStatusType, StoreId},
    market_api::errors::MarketError,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

//--------------------------------------      Pagination      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if self.offset < 0 {
            return Err(MarketError::validation(format!("Offset must not be negative, got {}", self.offset)));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.limit) {
            return Err(MarketError::validation(format!(
                "Limit must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

/// One page of results together with the exact number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let has_more = total > pagination.offset.saturating_add(pagination.limit);
        Self { items, total, offset: pagination.offset, limit: pagination.limit, has_more }
    }
}

//--------------------------------------   OrderQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub buyer: Option<Address>,
    pub store_id: Option<StoreId>,
    pub seller: Option<Address>,
    pub status: Option<Vec<OrderStatusType>>,
    pub withdrawn: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_buyer(mut self, buyer: Address) -> Self {
        self.buyer = Some(buyer);
        self
    }

    pub fn with_store_id(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    /// Restricts results to orders placed with stores owned by `seller`.
    pub fn with_seller(mut self, seller: Address) -> Self {
        self.seller = Some(seller);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_withdrawn(mut self, withdrawn: bool) -> Self {
        self.withdrawn = Some(withdrawn);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buyer.is_none() &&
            self.store_id.is_none() &&
            self.seller.is_none() &&
            self.status.is_none() &&
            self.withdrawn.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(buyer) = &self.buyer {
            write!(f, "buyer: {buyer}. ")?;
        }
        if let Some(store_id) = &self.store_id {
            write!(f, "store: {store_id}. ")?;
        }
        if let Some(seller) = &self.seller {
            write!(f, "seller: {seller}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(withdrawn) = &self.withdrawn {
            write!(f, "withdrawn: {withdrawn}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------  Transaction report  ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReportRow {
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub buyer: Address,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub amount: MicroUnits,
    pub platform_fee: MicroUnits,
    pub seller_revenue: MicroUnits,
    pub status: OrderStatusType,
    pub withdrawn: bool,
}

impl TransactionReportRow {
    pub fn new(order: &Order, fee_rate: &FeeRate) -> Self {
        Self {
            order_id: order.id,
            store_id: order.store_id,
            buyer: order.buyer.clone(),
            currency: order.currency,
            created_at: order.created_at,
            amount: order.amount,
            platform_fee: fee_rate.platform_fee(order.amount),
            seller_revenue: fee_rate.seller_revenue(order.amount),
            status: order.status,
            withdrawn: order.withdrawn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyTotals {
    pub currency: Currency,
    pub orders: i64,
    pub amount: MicroUnits,
    pub platform_fee: MicroUnits,
    pub seller_revenue: MicroUnits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReport {
    pub since: DateTime<Utc>,
    pub fee_rate_bps: u32,
    pub rows: Vec<TransactionReportRow>,
    pub totals: Vec<CurrencyTotals>,
}

impl TransactionReport {
    pub fn new(since: DateTime<Utc>, fee_rate: &FeeRate, orders: &[Order]) -> Self {
        let rows: Vec<TransactionReportRow> = orders.iter().map(|o| TransactionReportRow::new(o, fee_rate)).collect();
        let mut totals: Vec<CurrencyTotals> = Vec::new();
        for row in &rows {
            let idx = match totals.iter().position(|t| t.currency == row.currency) {
                Some(idx) => idx,
                None => {
                    totals.push(CurrencyTotals {
                        currency: row.currency,
                        orders: 0,
                        amount: MicroUnits::default(),
                        platform_fee: MicroUnits::default(),
                        seller_revenue: MicroUnits::default(),
                    });
                    totals.len() - 1
                },
            };
            let t = &mut totals[idx];
            t.orders += 1;
            t.amount += row.amount;
            t.platform_fee += row.platform_fee;
            t.seller_revenue += row.seller_revenue;
        }
        Self { since, fee_rate_bps: fee_rate.bps(), rows, totals }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn has_more_is_exact() {
        let p = Pagination::new(0, 10);
        assert!(!Page::new(vec![0; 10], 10, p).has_more);
        assert!(Page::new(vec![0; 10], 11, p).has_more);
        let p = Pagination::new(10, 10);
        assert!(!Page::new(vec![0; 1], 11, p).has_more);
        let far = Pagination::new(i64::MAX, 10);
        assert!(far.validate().is_ok());
        assert!(!Page::<i32>::new(vec![], 3, far).has_more);
    }

    #[test]
    fn pagination_bounds() {
        assert!(Pagination::default().validate().is_ok());
        assert!(Pagination::new(-1, 10).validate().is_err());
        assert!(Pagination::new(0, 0).validate().is_err());
        assert!(Pagination::new(0, MAX_PAGE_SIZE + 1).validate().is_err());
    }

    #[test]
    fn filter_builder() {
        let filter =
            OrderQueryFilter::default().with_status(OrderStatusType::Paid).with_status(OrderStatusType::Fulfilled);
        assert_eq!(filter.status.as_ref().map(Vec::len), Some(2));
        assert!(!filter.is_empty());
        assert!(OrderQueryFilter::default().is_empty());
    }
}
