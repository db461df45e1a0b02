use campus_market_engine::db_types::{NewProduct, NewStore};
use cucumber::given;

use crate::{
    cucumber::{market_world::MarketSystem, MarketWorld},
    support::prepare_env::{address, units},
};

#[given(expr = "a fresh marketplace with a platform fee of {int} bps")]
async fn fresh_marketplace(world: &mut MarketWorld, fee_bps: u32) {
    let system = MarketSystem::new(fee_bps).await;
    world.system = Some(system);
}

#[given(expr = "'{word}' runs a store at {float}, {float}")]
async fn seller_store(world: &mut MarketWorld, owner: String, latitude: f64, longitude: f64) {
    let store = NewStore::new(format!("{owner}'s shop"), "general".to_string(), latitude, longitude);
    let store = world.market().stores.create_store(&address(&owner), store).await.expect("Error creating store");
    world.sys().stores.insert(owner, store);
}

#[given(expr = "the store of '{word}' sells '{word}' at {word} with {int} in stock")]
async fn store_product(world: &mut MarketWorld, owner: String, name: String, price: String, inventory: i64) {
    let store = world.store_of(&owner);
    let product = NewProduct::new(name.clone(), "general".to_string(), units(&price), inventory);
    let product = world
        .market()
        .stores
        .create_product(&address(&owner), store.id, product)
        .await
        .expect("Error creating product");
    world.sys().products.insert(name, product);
}
