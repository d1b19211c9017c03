//! Coordinate and derived-result row types.
//!
//! These are thin projections of spatial engine rows. Geometry itself is
//! always carried as GeoJSON [`serde_json::Value`] payloads produced by the
//! engine; this crate never interprets geometry.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// A tracked entity's coordinates, as served by the marker endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerPoint {
    /// Longitude (`ST_X` of the stored point).
    pub x: f64,
    /// Latitude (`ST_Y` of the stored point).
    pub y: f64,
}

/// The result of a position update, echoing the entity's new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPosition {
    /// The tracked entity's row id.
    pub id: EntityId,
    /// Longitude of the updated point.
    pub x: f64,
    /// Latitude of the updated point.
    pub y: f64,
    /// The updated point geometry as GeoJSON.
    pub geom: serde_json::Value,
}

/// One row of the cluster-membership query.
///
/// The engine's DBSCAN query returns the number of points sharing a cluster
/// with the watched entity; the row shape is preserved so the HTTP response
/// matches the engine output exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCount {
    /// Points in the watched entity's cluster (0 rows when unclustered).
    pub num_points_in_cluster: i64,
}
