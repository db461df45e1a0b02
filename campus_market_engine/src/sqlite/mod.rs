//! SQLite backend for the campus marketplace settlement engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
