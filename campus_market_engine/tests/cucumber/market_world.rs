use std::collections::HashMap;

use campus_market_engine::{
    db_types::{Address, OrderId, Product, Store, WithdrawalDetail},
    ErrorCode,
    Marketplace,
    MarketError,
    SqliteDatabase,
};
use cucumber::World;

use crate::support::prepare_env::{address, prepare_test_env, TestMarket};

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
}

/// A fresh marketplace plus the names the scenario has given to the things it created.
pub struct MarketSystem {
    pub test: TestMarket,
    pub stores: HashMap<String, Store>,
    pub products: HashMap<String, Product>,
    pub orders: HashMap<String, OrderId>,
    pub last_withdrawal: Option<WithdrawalDetail>,
    pub last_error: Option<MarketError>,
}

impl std::fmt::Debug for MarketSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarketSystem ({}, {} orders)", self.test.url, self.orders.len())
    }
}

impl MarketSystem {
    pub async fn new(fee_bps: u32) -> Self {
        let test = prepare_test_env(fee_bps).await;
        Self {
            test,
            stores: HashMap::new(),
            products: HashMap::new(),
            orders: HashMap::new(),
            last_withdrawal: None,
            last_error: None,
        }
    }
}

impl MarketWorld {
    pub fn sys(&mut self) -> &mut MarketSystem {
        self.system.as_mut().expect("Marketplace not initialised")
    }

    pub fn market(&self) -> &Marketplace<SqliteDatabase> {
        &self.system.as_ref().expect("Marketplace not initialised").test.market
    }

    pub fn admin(&self) -> Address {
        address("admin")
    }

    pub fn store_of(&self, owner: &str) -> Store {
        let sys = self.system.as_ref().expect("Marketplace not initialised");
        sys.stores.get(owner).cloned().unwrap_or_else(|| panic!("'{owner}' has no store"))
    }

    pub fn product(&self, name: &str) -> Product {
        let sys = self.system.as_ref().expect("Marketplace not initialised");
        sys.products.get(name).cloned().unwrap_or_else(|| panic!("No product called '{name}'"))
    }

    pub fn order_id(&self, label: &str) -> OrderId {
        let sys = self.system.as_ref().expect("Marketplace not initialised");
        *sys.orders.get(label).unwrap_or_else(|| panic!("No order labelled {label}"))
    }

    /// Records the outcome of a fallible step so that a later step can assert on it.
    pub fn record<T>(&mut self, result: Result<T, MarketError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.sys().last_error = None;
                Some(v)
            },
            Err(e) => {
                self.sys().last_error = Some(e);
                None
            },
        }
    }

    pub fn last_error_code(&self) -> Option<ErrorCode> {
        self.system.as_ref().and_then(|s| s.last_error.as_ref()).map(|e| e.code())
    }
}
