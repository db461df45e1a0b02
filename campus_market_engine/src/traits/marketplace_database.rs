use crate::{
    market_api::errors::MarketError,
    traits::{OrderManagement, PointsManagement, ProfileManagement, StoreManagement, WithdrawalManagement},
};

/// The highest level of behaviour for backends supporting the marketplace settlement engine.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase:
    Clone + StoreManagement + OrderManagement + WithdrawalManagement + PointsManagement + ProfileManagement
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketError> {
        Ok(())
    }
}
