use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::{Address, Order, OrderId, Store, StoreId},
    market_api::errors::MarketError,
    traits::{AdminAllowList, CallerIdentity, MarketplaceDatabase},
};

/// Resolves who is calling and checks ownership or admin rights against store and order records.
///
/// The ownership chain for an order is `Order -> store_id -> Store.owner_address`. Every check re-reads the records,
/// so a decision is never based on a stale copy held by the caller.
#[derive(Clone)]
pub struct AuthorizationGate<B> {
    db: B,
    admins: Arc<dyn AdminAllowList + Send + Sync>,
}

impl<B> Debug for AuthorizationGate<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthorizationGate")
    }
}

impl<B> AuthorizationGate<B> {
    pub fn new(db: B, admins: Arc<dyn AdminAllowList + Send + Sync>) -> Self {
        Self { db, admins }
    }

    /// Resolves the caller behind `request`, failing with `Unauthenticated` for anonymous requests.
    pub fn resolve_caller<R, I>(identity: &I, request: &R) -> Result<Address, MarketError>
    where I: CallerIdentity<R> {
        identity.resolve_caller_address(request).ok_or(MarketError::Unauthenticated)
    }

    pub fn is_admin(&self, address: &Address) -> bool {
        self.admins.is_admin(address)
    }

    pub fn require_admin(&self, caller: &Address) -> Result<(), MarketError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            warn!("🔄️🔐️ {caller} attempted an administrator action");
            Err(MarketError::NotAdmin(caller.clone()))
        }
    }
}

impl<B> AuthorizationGate<B>
where B: MarketplaceDatabase
{
    /// Returns the store if `caller` owns it.
    pub async fn require_store_owner(&self, caller: &Address, store_id: StoreId) -> Result<Store, MarketError> {
        let store = self.db.fetch_store(store_id).await?.ok_or(MarketError::StoreNotFound(store_id))?;
        if &store.owner_address != caller {
            warn!("🔄️🔐️ {caller} is not the owner of store {store_id}");
            return Err(MarketError::forbidden(caller, format!("manage store {store_id}")));
        }
        Ok(store)
    }

    /// Returns the store if `caller` owns it or is an administrator.
    pub async fn require_store_owner_or_admin(
        &self,
        caller: &Address,
        store_id: StoreId,
    ) -> Result<Store, MarketError> {
        let store = self.db.fetch_store(store_id).await?.ok_or(MarketError::StoreNotFound(store_id))?;
        if &store.owner_address == caller {
            return Ok(store);
        }
        if self.is_admin(caller) {
            info!("🔄️🔐️ Administrator {caller} is acting on store {store_id}");
            return Ok(store);
        }
        warn!("🔄️🔐️ {caller} is neither the owner of store {store_id} nor an administrator");
        Err(MarketError::forbidden(caller, format!("manage store {store_id}")))
    }

    /// Returns the order and its store if `caller` owns the store the order was placed with.
    pub async fn require_order_store_owner(
        &self,
        caller: &Address,
        order_id: OrderId,
    ) -> Result<(Order, Store), MarketError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(MarketError::OrderNotFound(order_id))?;
        let store = self.db.fetch_store(order.store_id).await?.ok_or(MarketError::StoreNotFound(order.store_id))?;
        if &store.owner_address != caller {
            warn!("🔄️🔐️ {caller} tried to act on order {order_id} of store {}", store.id);
            return Err(MarketError::forbidden(caller, format!("manage order {order_id}")));
        }
        Ok((order, store))
    }
}
