//! # Backend contracts
//!
//! This module defines the behaviour a storage backend must expose to serve the marketplace settlement engine. The
//! public API structs in [`crate::market_api`] are generic over these traits, so the engine never talks to a
//! particular database directly.
//!
//! * [`StoreManagement`] covers stores, products and the geohash-prefix store lookup.
//! * [`OrderManagement`] covers the atomic creation of orders with their lines, and conditional (compare-and-swap)
//!   status changes.
//! * [`WithdrawalManagement`] covers claiming orders into withdrawal requests, at most once per order.
//! * [`PointsManagement`] covers the append-only points log and its derived totals.
//! * [`ProfileManagement`] covers wallet-holder profiles.
//! * [`MarketplaceDatabase`] ties the above together.
//!
//! The identity traits ([`CallerIdentity`], [`AdminAllowList`]) are implemented by the surrounding web application.
mod identity;
mod marketplace_database;
mod order_management;
mod points_management;
mod profile_management;
mod store_management;
mod withdrawal_management;

pub use identity::{AdminAllowList, CallerIdentity, StaticAdminList};
pub use marketplace_database::MarketplaceDatabase;
pub use order_management::OrderManagement;
pub use points_management::PointsManagement;
pub use profile_management::ProfileManagement;
pub use store_management::StoreManagement;
pub use withdrawal_management::WithdrawalManagement;
