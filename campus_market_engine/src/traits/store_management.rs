use crate::{
    db_types::{Address, NewProduct, NewStore, Product, ProductId, ProductUpdate, Store, StoreId, StoreUpdate},
    geohash::GeohashPrefix,
    market_api::errors::MarketError,
};

/// Persistence for stores and their products.
///
/// Backends store the geohash they are handed; computing it from the coordinates is the caller's job, which keeps the
/// precision policy in one place.
#[allow(async_fn_in_trait)]
pub trait StoreManagement {
    async fn insert_store(&self, owner: &Address, store: NewStore, geohash: String) -> Result<Store, MarketError>;

    async fn fetch_store(&self, id: StoreId) -> Result<Option<Store>, MarketError>;

    /// Stores owned by `owner`, newest first.
    async fn fetch_stores_for_owner(&self, owner: &Address) -> Result<Vec<Store>, MarketError>;

    /// Applies the non-empty fields of `update`. Returns `None` if the store does not exist.
    async fn update_store(&self, id: StoreId, update: StoreUpdate) -> Result<Option<Store>, MarketError>;

    /// Moves a store. The coordinates and the geohash are written in the same statement.
    async fn update_store_location(
        &self,
        id: StoreId,
        latitude: f64,
        longitude: f64,
        geohash: String,
    ) -> Result<Option<Store>, MarketError>;

    /// Stores whose geohash starts with `prefix`, ordered by geohash and then id, capped at `limit` rows.
    async fn search_stores_by_geohash(&self, prefix: &GeohashPrefix, limit: i64) -> Result<Vec<Store>, MarketError>;

    async fn insert_product(&self, store_id: StoreId, product: NewProduct) -> Result<Product, MarketError>;

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, MarketError>;

    async fn fetch_products_for_store(&self, store_id: StoreId) -> Result<Vec<Product>, MarketError>;

    /// Applies the non-empty fields of `update`. Returns `None` if the product does not exist.
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Option<Product>, MarketError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_product(&self, id: ProductId) -> Result<bool, MarketError>;
}
