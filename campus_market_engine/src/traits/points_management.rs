use crate::{
    db_types::{Address, NewPointsEntry, PointsLedgerEntry},
    market_api::{errors::MarketError, order_objects::Pagination},
};

/// Persistence for the append-only points log. Totals are always aggregated from the log.
#[allow(async_fn_in_trait)]
pub trait PointsManagement {
    /// Appends `entry` and returns it with the new total for the address, computed in the same transaction.
    ///
    /// When `require_non_negative` is set and the new total would fall below zero, nothing is written and
    /// `InsufficientPoints` is returned.
    async fn append_points(
        &self,
        entry: NewPointsEntry,
        require_non_negative: bool,
    ) -> Result<(PointsLedgerEntry, i64), MarketError>;

    async fn points_total(&self, address: &Address) -> Result<i64, MarketError>;

    /// Entries for `address`, most recent first.
    async fn points_history(
        &self,
        address: &Address,
        pagination: Option<Pagination>,
    ) -> Result<Vec<PointsLedgerEntry>, MarketError>;
}
