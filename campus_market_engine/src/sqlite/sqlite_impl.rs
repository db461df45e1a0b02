//! `SqliteDatabase` is a concrete implementation of a campus marketplace backend.
//!
//! It uses SQLite as the backend and implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use campus_common::FeeRate;
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, orders, points, products, profiles, stores, withdrawals};
use crate::{
    config::EngineConfig,
    db_types::{
        Address,
        FullOrder,
        NewOrder,
        NewPointsEntry,
        NewProduct,
        NewStore,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        PaymentUpdate,
        PointsLedgerEntry,
        Product,
        ProductId,
        ProductUpdate,
        Profile,
        ProfileUpdate,
        Store,
        StoreId,
        StoreUpdate,
        WithdrawalDetail,
        WithdrawalId,
        WithdrawalRequest,
        WithdrawalStatus,
    },
    geohash::GeohashPrefix,
    market_api::{
        errors::MarketError,
        order_objects::{OrderQueryFilter, Page, Pagination},
    },
    traits::{
        MarketplaceDatabase,
        OrderManagement,
        PointsManagement,
        ProfileManagement,
        StoreManagement,
        WithdrawalManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), MarketError> {
        self.pool.close().await;
        info!("🗃️ Database connection pool closed");
        Ok(())
    }
}

impl StoreManagement for SqliteDatabase {
    async fn insert_store(&self, owner: &Address, store: NewStore, geohash: String) -> Result<Store, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let store = stores::insert_store(owner, store, geohash, &mut conn).await?;
        Ok(store)
    }

    async fn fetch_store(&self, id: StoreId) -> Result<Option<Store>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let store = stores::fetch_store(id, &mut conn).await?;
        Ok(store)
    }

    async fn fetch_stores_for_owner(&self, owner: &Address) -> Result<Vec<Store>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let stores = stores::fetch_stores_for_owner(owner, &mut conn).await?;
        Ok(stores)
    }

    async fn update_store(&self, id: StoreId, update: StoreUpdate) -> Result<Option<Store>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let store = stores::update_store(id, update, &mut conn).await?;
        Ok(store)
    }

    async fn update_store_location(
        &self,
        id: StoreId,
        latitude: f64,
        longitude: f64,
        geohash: String,
    ) -> Result<Option<Store>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let store = stores::update_store_location(id, latitude, longitude, geohash, &mut conn).await?;
        Ok(store)
    }

    async fn search_stores_by_geohash(&self, prefix: &GeohashPrefix, limit: i64) -> Result<Vec<Store>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let stores = stores::search_by_geohash(prefix, limit, &mut conn).await?;
        Ok(stores)
    }

    async fn insert_product(&self, store_id: StoreId, product: NewProduct) -> Result<Product, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(store_id, product, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products_for_store(&self, store_id: StoreId) -> Result<Vec<Product>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_products_for_store(store_id, &mut conn).await?;
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Option<Product>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::update_product(id, update, &mut conn).await?;
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = products::delete_product(id, &mut conn).await?;
        Ok(deleted)
    }
}

impl OrderManagement for SqliteDatabase {
    /// Takes a new order, and in a single atomic transaction,
    /// * reserves inventory for every line (each line must belong to the order's store),
    /// * stores the order with status `Pending` and the captured unit prices on its lines.
    ///
    /// If any line fails, the transaction is dropped and nothing is persisted.
    async fn insert_order(&self, order: NewOrder) -> Result<FullOrder, MarketError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(id, &mut conn).await?;
        Ok(items)
    }

    async fn mark_order_paid(&self, id: OrderId, tx_signature: &str) -> Result<PaymentUpdate, MarketError> {
        let mut tx = self.pool.begin().await?;
        let update = orders::mark_paid(id, tx_signature, &mut tx).await?;
        tx.commit().await?;
        Ok(update)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Order, MarketError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_status(id, from, to, &mut tx).await?;
        if to == OrderStatusType::Cancelled {
            products::restock_order(id, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(order)
    }

    async fn search_orders(&self, filter: OrderQueryFilter, limit: Option<i64>) -> Result<Vec<Order>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let pagination = limit.map(|l| Pagination::new(0, l));
        let orders = orders::search_orders(filter, pagination, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_order_page(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Page<Order>, MarketError> {
        // Both reads share one transaction so the total matches the page
        let mut tx = self.pool.begin().await?;
        let total = orders::count_orders(filter.clone(), &mut tx).await?;
        let items = orders::search_orders(filter, Some(pagination), &mut tx).await?;
        tx.commit().await?;
        Ok(Page::new(items, total, pagination))
    }
}

impl WithdrawalManagement for SqliteDatabase {
    async fn claim_orders_for_withdrawal(
        &self,
        seller: &Address,
        order_ids: &[OrderId],
        fee_rate: FeeRate,
        notes: Option<String>,
    ) -> Result<WithdrawalDetail, MarketError> {
        let mut tx = self.pool.begin().await?;
        let detail = withdrawals::create_withdrawal(seller, order_ids, fee_rate, notes, &mut tx).await?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn fetch_withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalDetail>, MarketError> {
        let mut tx = self.pool.begin().await?;
        let request = match withdrawals::fetch_withdrawal_request(id, &mut tx).await? {
            Some(r) => r,
            None => return Ok(None),
        };
        let order_ids = withdrawals::fetch_withdrawal_order_ids(id, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(WithdrawalDetail { request, order_ids }))
    }

    async fn update_withdrawal_status(
        &self,
        id: WithdrawalId,
        to: WithdrawalStatus,
        tx_signature: Option<&str>,
    ) -> Result<WithdrawalRequest, MarketError> {
        let mut tx = self.pool.begin().await?;
        let request = withdrawals::update_status(id, to, tx_signature, &mut tx).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn release_withdrawn_orders(&self, id: WithdrawalId) -> Result<u64, MarketError> {
        let mut tx = self.pool.begin().await?;
        let released = withdrawals::release_orders(id, &mut tx).await?;
        tx.commit().await?;
        Ok(released)
    }

    async fn fetch_withdrawals_for_seller(&self, seller: &Address) -> Result<Vec<WithdrawalRequest>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let requests = withdrawals::fetch_withdrawals_for_seller(seller, &mut conn).await?;
        Ok(requests)
    }
}

impl PointsManagement for SqliteDatabase {
    async fn append_points(
        &self,
        entry: NewPointsEntry,
        require_non_negative: bool,
    ) -> Result<(PointsLedgerEntry, i64), MarketError> {
        let mut tx = self.pool.begin().await?;
        let entry = points::insert_entry(entry, &mut tx).await?;
        let total = points::total_for_address(&entry.address, &mut tx).await?;
        if require_non_negative && total < 0 {
            // Dropping the transaction discards the entry
            return Err(MarketError::InsufficientPoints {
                address: entry.address,
                requested: -entry.delta,
                available: total - entry.delta,
            });
        }
        tx.commit().await?;
        Ok((entry, total))
    }

    async fn points_total(&self, address: &Address) -> Result<i64, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let total = points::total_for_address(address, &mut conn).await?;
        Ok(total)
    }

    async fn points_history(
        &self,
        address: &Address,
        pagination: Option<Pagination>,
    ) -> Result<Vec<PointsLedgerEntry>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let history = points::history_for_address(address, pagination, &mut conn).await?;
        Ok(history)
    }
}

impl ProfileManagement for SqliteDatabase {
    async fn upsert_profile(&self, address: &Address, update: ProfileUpdate) -> Result<Profile, MarketError> {
        let mut tx = self.pool.begin().await?;
        profiles::upsert_profile(address, update, &mut tx).await?;
        let profile = profiles::fetch_profile(address, &mut tx)
            .await?
            .ok_or_else(|| MarketError::InternalError(format!("Profile for {address} vanished after upsert")))?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn fetch_profile(&self, address: &Address) -> Result<Option<Profile>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let profile = profiles::fetch_profile(address, &mut conn).await?;
        Ok(profile)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object from the engine configuration, applying the embedded migrations if
    /// `config.run_migrations` is set.
    pub async fn new(config: &EngineConfig) -> Result<Self, MarketError> {
        let db = SqliteDatabase::new_with_url(config.database_url.reveal(), config.max_connections).await?;
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub async fn run_migrations(&self) -> Result<(), MarketError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MarketError::InternalError(format!("Could not apply migrations. {e}")))?;
        info!("🗃️ Database migrations applied");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
