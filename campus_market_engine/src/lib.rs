//! Campus Marketplace Settlement Engine
//!
//! This library contains the core logic behind the campus marketplace: the order lifecycle from checkout through
//! payment and fulfilment, seller withdrawals of accumulated revenue, the reward points ledger, and the geohash index
//! behind "stores near me". It is agnostic of the web framework that serves it.
//!
//! The library is divided into three main sections:
//! 1. Database management. [`traits`] defines what a backend must provide, and [`SqliteDatabase`] implements it on
//!    SQLite. The data types stored by the backends are defined in [`db_types`] and are public.
//! 2. The public API ([`market_api`]). Route handlers use these structs rather than the database, since they are
//!    where authorization, validation and the state machines live.
//! 3. Supporting modules: [`geohash`] for spatial indexing and [`config`] for runtime policy.
pub mod config;
pub mod db_types;
pub mod geohash;
pub mod market_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

pub use config::EngineConfig;
pub use market_api::{
    auth_gate::AuthorizationGate,
    errors::{ErrorCode, MarketError},
    order_flow_api::OrderFlowApi,
    order_objects,
    points_api::PointsApi,
    profile_api::ProfileApi,
    response::ApiResponse,
    store_api::StoreApi,
    withdrawal_api::WithdrawalApi,
    Marketplace,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AdminAllowList,
    CallerIdentity,
    MarketplaceDatabase,
    OrderManagement,
    PointsManagement,
    ProfileManagement,
    StaticAdminList,
    StoreManagement,
    WithdrawalManagement,
};
