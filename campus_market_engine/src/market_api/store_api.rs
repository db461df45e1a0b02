use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Address, NewProduct, NewStore, Product, ProductId, ProductUpdate, Store, StoreId, StoreUpdate},
    geohash::{self, GeohashPrefix},
    market_api::{auth_gate::AuthorizationGate, errors::MarketError},
    traits::MarketplaceDatabase,
};

/// `StoreApi` manages stores and their products, and serves the "stores near me" lookup.
pub struct StoreApi<B> {
    db: B,
    gate: AuthorizationGate<B>,
    geohash_precision: usize,
    nearby_limit: i64,
}

impl<B> Debug for StoreApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StoreApi (precision {}, limit {})", self.geohash_precision, self.nearby_limit)
    }
}

impl<B> StoreApi<B> {
    pub fn new(db: B, gate: AuthorizationGate<B>, geohash_precision: usize, nearby_limit: i64) -> Self {
        Self { db, gate, geohash_precision, nearby_limit }
    }
}

impl<B> StoreApi<B>
where B: MarketplaceDatabase
{
    /// Creates a store owned by `owner`. The geohash is derived from the coordinates.
    pub async fn create_store(&self, owner: &Address, store: NewStore) -> Result<Store, MarketError> {
        validate_name("Store name", &store.name)?;
        let cell = geohash::encode(store.latitude, store.longitude, self.geohash_precision)?;
        let store = self.db.insert_store(owner, store, cell).await?;
        info!("🔄️🏪️ Store {} created by {owner}", store.id);
        Ok(store)
    }

    pub async fn update_store(
        &self,
        caller: &Address,
        store_id: StoreId,
        update: StoreUpdate,
    ) -> Result<Store, MarketError> {
        self.gate.require_store_owner(caller, store_id).await?;
        if let Some(name) = &update.name {
            validate_name("Store name", name)?;
        }
        if update.is_empty() {
            debug!("🔄️🏪️ Nothing to change on store {store_id}");
        }
        self.db.update_store(store_id, update).await?.ok_or(MarketError::StoreNotFound(store_id))
    }

    /// Moves a store and recomputes its geohash in the same write.
    pub async fn update_store_location(
        &self,
        caller: &Address,
        store_id: StoreId,
        latitude: f64,
        longitude: f64,
    ) -> Result<Store, MarketError> {
        let cell = geohash::encode(latitude, longitude, self.geohash_precision)?;
        self.gate.require_store_owner(caller, store_id).await?;
        let store = self
            .db
            .update_store_location(store_id, latitude, longitude, cell)
            .await?
            .ok_or(MarketError::StoreNotFound(store_id))?;
        debug!("🔄️🏪️ Store {store_id} relocated to cell {}", store.geohash);
        Ok(store)
    }

    pub async fn fetch_store(&self, store_id: StoreId) -> Result<Store, MarketError> {
        self.db.fetch_store(store_id).await?.ok_or(MarketError::StoreNotFound(store_id))
    }

    pub async fn stores_for_owner(&self, owner: &Address) -> Result<Vec<Store>, MarketError> {
        self.db.fetch_stores_for_owner(owner).await
    }

    /// Stores whose geohash starts with `prefix` (case-insensitive).
    ///
    /// This is a cell lookup, not a radius search: stores just across a cell boundary are not returned. At most
    /// `limit` rows are returned, capped at the configured maximum.
    pub async fn nearby_stores(&self, prefix: &str, limit: Option<i64>) -> Result<Vec<Store>, MarketError> {
        let prefix = GeohashPrefix::new(prefix)?;
        let limit = match limit {
            Some(l) if l < 1 => return Err(MarketError::validation(format!("Limit must be positive, got {l}"))),
            Some(l) => l.min(self.nearby_limit),
            None => self.nearby_limit,
        };
        let stores = self.db.search_stores_by_geohash(&prefix, limit).await?;
        trace!("🔄️🏪️ {} stores near cell {prefix}", stores.len());
        Ok(stores)
    }

    pub async fn create_product(
        &self,
        caller: &Address,
        store_id: StoreId,
        product: NewProduct,
    ) -> Result<Product, MarketError> {
        self.gate.require_store_owner(caller, store_id).await?;
        validate_name("Product name", &product.name)?;
        validate_price_and_inventory(Some(product.price.value()), Some(product.inventory))?;
        let product = self.db.insert_product(store_id, product).await?;
        debug!("🔄️🏪️ Product {} listed in store {store_id}", product.id);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        caller: &Address,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, MarketError> {
        let product = self.db.fetch_product(product_id).await?.ok_or(MarketError::ProductNotFound(product_id))?;
        self.gate.require_store_owner(caller, product.store_id).await?;
        if let Some(name) = &update.name {
            validate_name("Product name", name)?;
        }
        validate_price_and_inventory(update.price.map(|p| p.value()), update.inventory)?;
        self.db.update_product(product_id, update).await?.ok_or(MarketError::ProductNotFound(product_id))
    }

    /// Deletes a product. Only the store's owner or an administrator may do this.
    pub async fn delete_product(&self, caller: &Address, product_id: ProductId) -> Result<(), MarketError> {
        let product = self.db.fetch_product(product_id).await?.ok_or(MarketError::ProductNotFound(product_id))?;
        self.gate.require_store_owner_or_admin(caller, product.store_id).await?;
        if !self.db.delete_product(product_id).await? {
            return Err(MarketError::ProductNotFound(product_id));
        }
        info!("🔄️🏪️ Product {product_id} deleted by {caller}");
        Ok(())
    }

    pub async fn products_for_store(&self, store_id: StoreId) -> Result<Vec<Product>, MarketError> {
        self.db.fetch_products_for_store(store_id).await
    }
}

fn validate_name(what: &str, name: &str) -> Result<(), MarketError> {
    if name.trim().is_empty() {
        return Err(MarketError::validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn validate_price_and_inventory(price: Option<i64>, inventory: Option<i64>) -> Result<(), MarketError> {
    if let Some(price) = price {
        if price <= 0 {
            return Err(MarketError::validation("Price must be greater than zero"));
        }
    }
    if let Some(inventory) = inventory {
        if inventory < 0 {
            return Err(MarketError::validation(format!("Inventory must not be negative, got {inventory}")));
        }
    }
    Ok(())
}
