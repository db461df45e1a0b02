use std::{env, fmt::Display, str::FromStr};

use campus_common::{
    helpers::{parse_boolean_flag, parse_list},
    FeeRate,
    Secret,
    DEFAULT_FEE_RATE_BPS,
};
use log::*;

use crate::{
    db_types::Address,
    geohash::{DEFAULT_PRECISION, MAX_PRECISION},
    traits::StaticAdminList,
};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/campus_market.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_NEARBY_LIMIT: i64 = 50;

/// Runtime policy for the settlement engine.
///
/// The fee rate lives here, and only here. Build both `OrderFlowApi` and `WithdrawalApi` from the same config so
/// reporting and settlement agree on every fee.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: Secret<String>,
    pub max_connections: u32,
    pub fee_rate: FeeRate,
    /// Upper bound on rows returned by a geohash prefix lookup.
    pub nearby_limit: i64,
    /// Number of characters stored in `stores.geohash`.
    pub geohash_precision: usize,
    pub admin_addresses: Vec<Address>,
    pub run_migrations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: Secret::new(DEFAULT_DATABASE_URL.to_string()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            fee_rate: FeeRate::default(),
            nearby_limit: DEFAULT_NEARBY_LIMIT,
            geohash_precision: DEFAULT_PRECISION,
            admin_addresses: Vec::new(),
            run_migrations: true,
        }
    }
}

impl EngineConfig {
    pub fn new(database_url: &str) -> Self {
        Self { database_url: Secret::new(database_url.to_string()), ..Default::default() }
    }

    pub fn with_fee_rate(mut self, fee_rate: FeeRate) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_admin(mut self, admin: Address) -> Self {
        self.admin_addresses.push(admin);
        self
    }

    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key/value source. Invalid values are logged and replaced by their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("CMP_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ CMP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_or_default(&lookup, "CMP_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let fee_bps = parse_or_default(&lookup, "CMP_FEE_RATE_BPS", DEFAULT_FEE_RATE_BPS);
        let fee_rate = FeeRate::from_bps(fee_bps).unwrap_or_else(|e| {
            error!("🪛️ CMP_FEE_RATE_BPS is invalid. {e}. Using the default, {DEFAULT_FEE_RATE_BPS} bps.");
            FeeRate::default()
        });
        let mut nearby_limit = parse_or_default(&lookup, "CMP_NEARBY_LIMIT", DEFAULT_NEARBY_LIMIT);
        if nearby_limit < 1 {
            warn!("🪛️ CMP_NEARBY_LIMIT must be positive. Using the default, {DEFAULT_NEARBY_LIMIT}.");
            nearby_limit = DEFAULT_NEARBY_LIMIT;
        }
        let mut geohash_precision = parse_or_default(&lookup, "CMP_GEOHASH_PRECISION", DEFAULT_PRECISION);
        if !(1..=MAX_PRECISION).contains(&geohash_precision) {
            warn!("🪛️ CMP_GEOHASH_PRECISION must be between 1 and {MAX_PRECISION}. Using {DEFAULT_PRECISION}.");
            geohash_precision = DEFAULT_PRECISION;
        }
        let admin_addresses = lookup("CMP_ADMIN_ADDRESSES")
            .map(|s| {
                parse_list(&s)
                    .into_iter()
                    .filter_map(|a| match a.parse::<Address>() {
                        Ok(addr) => Some(addr),
                        Err(e) => {
                            warn!("🪛️ Ignoring admin entry in CMP_ADMIN_ADDRESSES. {e}");
                            None
                        },
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if admin_addresses.is_empty() {
            warn!("🪛️ No administrators are configured. Admin-only actions will be rejected.");
        }
        let run_migrations = parse_boolean_flag(lookup("CMP_RUN_MIGRATIONS"), true);
        let config = Self {
            database_url: Secret::new(database_url),
            max_connections,
            fee_rate,
            nearby_limit,
            geohash_precision,
            admin_addresses,
            run_migrations,
        };
        debug!("🪛️ Engine configuration: {config:?}");
        config
    }

    pub fn admin_list(&self) -> StaticAdminList {
        StaticAdminList::new(self.admin_addresses.iter().cloned())
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {key}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}
