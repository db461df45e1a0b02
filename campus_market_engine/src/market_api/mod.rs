//! # Campus marketplace public API
//!
//! The `market_api` module exposes the programmatic API of the settlement engine. Route handlers resolve the caller
//! (see [`crate::traits::CallerIdentity`]), call one of the APIs below, and serialise the outcome with
//! [`response::ApiResponse`].
//!
//! * [`store_api`] manages stores and products, and serves geohash-prefix store lookups.
//! * [`order_flow_api`] covers checkout, payment confirmation, seller fulfilment and the admin transaction report.
//! * [`withdrawal_api`] settles paid orders into seller withdrawal requests.
//! * [`points_api`] is the append-only rewards ledger.
//! * [`profile_api`] manages wallet-holder profiles.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements the backend traits it needs. The
//! [`Marketplace`] bundle builds all of them from one [`EngineConfig`], so reporting and settlement share a single fee
//! rate:
//!
//! ```rust,ignore
//! use campus_market_engine::{EngineConfig, Marketplace, SqliteDatabase};
//! let config = EngineConfig::from_env_or_default();
//! let db = SqliteDatabase::new(&config).await?;
//! let market = Marketplace::new(db, &config);
//! let eligible = market.withdrawals.list_eligible_orders(&seller).await?;
//! ```
use std::sync::Arc;

use crate::{config::EngineConfig, traits::MarketplaceDatabase};

pub mod auth_gate;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod points_api;
pub mod profile_api;
pub mod response;
pub mod store_api;
pub mod withdrawal_api;

use auth_gate::AuthorizationGate;
use order_flow_api::OrderFlowApi;
use points_api::PointsApi;
use profile_api::ProfileApi;
use store_api::StoreApi;
use withdrawal_api::WithdrawalApi;

/// Every API of the engine, wired to the same backend and policy.
#[derive(Debug)]
pub struct Marketplace<B> {
    pub gate: AuthorizationGate<B>,
    pub stores: StoreApi<B>,
    pub orders: OrderFlowApi<B>,
    pub withdrawals: WithdrawalApi<B>,
    pub points: PointsApi<B>,
    pub profiles: ProfileApi<B>,
}

impl<B> Marketplace<B>
where B: MarketplaceDatabase
{
    pub fn new(db: B, config: &EngineConfig) -> Self {
        let gate = AuthorizationGate::new(db.clone(), Arc::new(config.admin_list()));
        Self {
            stores: StoreApi::new(db.clone(), gate.clone(), config.geohash_precision, config.nearby_limit),
            orders: OrderFlowApi::new(db.clone(), gate.clone(), config.fee_rate),
            withdrawals: WithdrawalApi::new(db.clone(), gate.clone(), config.fee_rate),
            points: PointsApi::new(db.clone()),
            profiles: ProfileApi::new(db),
            gate,
        }
    }
}
