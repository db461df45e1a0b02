use campus_common::FeeRate;
use campus_market_engine::{
    db_types::{Address, MicroUnits, NewProduct, NewStore, Product, Store},
    EngineConfig,
    Marketplace,
    MarketplaceDatabase,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const DEFAULT_TEST_FEE_BPS: u32 = 500;

pub struct TestMarket {
    pub url: String,
    pub db: SqliteDatabase,
    pub market: Marketplace<SqliteDatabase>,
    pub admin: Address,
}

/// A deterministic, valid wallet address derived from a short base58-safe name, e.g. `address("buyer")`.
pub fn address(name: &str) -> Address {
    let mut s = name.to_string();
    while s.len() < 44 {
        s.push('1');
    }
    s.parse().unwrap_or_else(|e| panic!("Test address for '{name}' is invalid. {e}"))
}

pub fn units(s: &str) -> MicroUnits {
    s.parse().expect("Not a valid amount")
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/campus_market_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("🚀️ Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

pub async fn prepare_test_env(fee_bps: u32) -> TestMarket {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    create_database(&url).await;
    let admin = address("admin");
    let fee_rate = FeeRate::from_bps(fee_bps).expect("Invalid test fee rate");
    let config = EngineConfig::new(&url).with_fee_rate(fee_rate).with_admin(admin.clone());
    let db = SqliteDatabase::new(&config).await.expect("Error creating connection to database");
    let market = Marketplace::new(db.clone(), &config);
    debug!("🚀️ Test marketplace ready at {url}");
    TestMarket { url, db, market, admin }
}

pub async fn tear_down(mut test: TestMarket) {
    if let Err(e) = test.db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&test.url).await {
        warn!("🚀️ Could not remove {}: {e}", test.url);
    }
}

/// Creates a store for `owner` with a single product.
pub async fn stocked_store(
    market: &Marketplace<SqliteDatabase>,
    owner: &Address,
    product: &str,
    price: &str,
    inventory: i64,
) -> (Store, Product) {
    let store = market
        .stores
        .create_store(owner, NewStore::new("Corner Shop", "snacks", 31.2304, 121.4737))
        .await
        .expect("Error creating store");
    let product = market
        .stores
        .create_product(owner, store.id, NewProduct::new(product, "snacks", units(price), inventory))
        .await
        .expect("Error creating product");
    (store, product)
}
