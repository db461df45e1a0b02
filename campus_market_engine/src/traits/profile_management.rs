use crate::{
    db_types::{Address, Profile, ProfileUpdate},
    market_api::errors::MarketError,
};

#[allow(async_fn_in_trait)]
pub trait ProfileManagement {
    /// Creates the profile if needed and applies the non-empty fields of `update`.
    async fn upsert_profile(&self, address: &Address, update: ProfileUpdate) -> Result<Profile, MarketError>;

    /// The profile with its points total derived from the ledger.
    async fn fetch_profile(&self, address: &Address) -> Result<Option<Profile>, MarketError>;
}
