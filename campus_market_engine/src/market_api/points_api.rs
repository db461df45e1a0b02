use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Address, NewPointsEntry, PointsLedgerEntry},
    market_api::{errors::MarketError, order_objects::Pagination},
    traits::PointsManagement,
};

/// The reward points ledger. Entries are only ever appended; totals are aggregated from the log.
pub struct PointsApi<B> {
    db: B,
}

impl<B> Debug for PointsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PointsApi")
    }
}

impl<B> PointsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> PointsApi<B>
where B: PointsManagement
{
    /// Credits `points` to `address` and returns the new total.
    pub async fn award(&self, address: &Address, points: i64, reason: &str) -> Result<i64, MarketError> {
        let entry = new_entry(address, points, reason)?;
        let (entry, total) = self.db.append_points(entry, false).await?;
        debug!("🔄️⭐️ {address} awarded {points} points ({}). Total {total}", entry.reason);
        Ok(total)
    }

    /// Redeems `points` from `address` and returns the new total. Fails with `InsufficientPoints`, writing nothing,
    /// if the total would drop below zero.
    pub async fn deduct(&self, address: &Address, points: i64, reason: &str) -> Result<i64, MarketError> {
        let entry = new_entry(address, points, reason)?;
        let entry = NewPointsEntry { delta: -entry.delta, ..entry };
        let (entry, total) = self.db.append_points(entry, true).await?;
        debug!("🔄️⭐️ {address} redeemed {points} points ({}). Total {total}", entry.reason);
        Ok(total)
    }

    /// Entries for `address`, most recent first. Every call re-reads the log.
    pub async fn history(
        &self,
        address: &Address,
        pagination: Option<Pagination>,
    ) -> Result<Vec<PointsLedgerEntry>, MarketError> {
        if let Some(p) = &pagination {
            p.validate()?;
        }
        self.db.points_history(address, pagination).await
    }

    pub async fn total(&self, address: &Address) -> Result<i64, MarketError> {
        self.db.points_total(address).await
    }
}

fn new_entry(address: &Address, points: i64, reason: &str) -> Result<NewPointsEntry, MarketError> {
    if points <= 0 {
        return Err(MarketError::validation(format!("Points must be greater than zero, got {points}")));
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(MarketError::validation("A points entry needs a reason"));
    }
    Ok(NewPointsEntry { address: address.clone(), delta: points, reason: reason.to_string() })
}
