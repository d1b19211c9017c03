//! Spatial engine layer for the Atlas service.
//!
//! PostGIS and pgRouting are the computational core of the system; this
//! crate is the typed doorway to them. It provides:
//!
//! - [`postgres`] -- the shared connection pool for on-demand queries
//! - [`catalog`] -- the static table of spatial query templates
//! - [`engine`] -- the [`SpatialEngine`] trait and its pool-backed
//!   implementation
//! - [`listener`] -- the dedicated LISTEN connection with reconnect/backoff
//! - [`error`] -- the [`DbError`] taxonomy separating "engine unreachable"
//!   from "engine rejected the query"

pub mod catalog;
pub mod engine;
pub mod error;
pub mod listener;
pub mod postgres;

// Re-export primary types for convenience.
pub use catalog::{LAYER_QUERIES, LayerQuery, ResponseShape};
pub use engine::SpatialEngine;
pub use error::DbError;
pub use listener::ChangeListener;
pub use postgres::{PostgresConfig, PostgresPool};
