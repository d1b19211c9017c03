//! HTTP API layer for the Atlas spatial query service.
//!
//! This crate provides the Axum server that fronts the spatial engine:
//!
//! - **On-demand endpoints** built once from the static query catalog,
//!   each call forwarded fresh to the engine
//! - **Notification-driven endpoints** (`/clusterResult`, `/realSource`)
//!   served from a derived-result cache the [`RecomputeWorker`] refreshes
//!   whenever a change notification arrives
//! - **The mutation endpoint** (`POST /data`) that moves the watched
//!   entity and thereby produces the change notifications
//!
//! # Architecture
//!
//! The route table and the derived cache are strictly separated: routes
//! are registered once at startup, notifications only mutate cached state.
//! The engine is injected behind the
//! [`SpatialEngine`](atlas_db::SpatialEngine) trait so tests run against a
//! fake engine without a database.

pub mod error;
pub mod handlers;
pub mod recompute;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use recompute::{DerivedKey, RecomputeWorker};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, DerivedCache};
