//! Shared type definitions for the Atlas spatial query service.
//!
//! This crate is the single source of truth for the plain types that flow
//! between the data layer, the recompute worker, and the HTTP layer. It has
//! no I/O dependencies so every other crate in the workspace can depend on
//! it without pulling in the database or web stack.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrapper for tracked entities
//! - [`events`] -- Change notification events emitted by the listener
//! - [`geo`] -- Coordinate and derived-result row types

pub mod events;
pub mod geo;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use events::ChangeEvent;
pub use geo::{ClusterCount, EntityPosition, MarkerPoint};
pub use ids::EntityId;
