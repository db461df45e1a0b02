use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Address, Profile, ProfileUpdate},
    market_api::errors::MarketError,
    traits::ProfileManagement,
};

pub struct ProfileApi<B> {
    db: B,
}

impl<B> Debug for ProfileApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProfileApi")
    }
}

impl<B> ProfileApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ProfileApi<B>
where B: ProfileManagement
{
    /// Creates or updates the caller's own profile. Fields left as `None` keep their current value.
    pub async fn upsert(&self, caller: &Address, update: ProfileUpdate) -> Result<Profile, MarketError> {
        if update.name.as_deref().map(|n| n.trim().is_empty()).unwrap_or(false) {
            return Err(MarketError::validation("Display name must not be empty"));
        }
        let profile = self.db.upsert_profile(caller, update).await?;
        debug!("🔄️👤️ Profile for {caller} saved");
        Ok(profile)
    }

    /// The profile with its points total derived from the ledger.
    pub async fn fetch(&self, address: &Address) -> Result<Profile, MarketError> {
        self.db.fetch_profile(address).await?.ok_or_else(|| MarketError::ProfileNotFound(address.clone()))
    }
}
