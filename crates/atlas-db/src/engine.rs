//! The spatial engine trait and its `PostgreSQL` implementation.
//!
//! [`SpatialEngine`] is the seam between the HTTP layer and the engine:
//! handlers and the recompute worker hold `Arc<dyn SpatialEngine>` so tests
//! can substitute a fake engine without a live database. The production
//! implementation lives on [`PostgresPool`] and executes the templates from
//! the [`catalog`](crate::catalog).

use async_trait::async_trait;
use atlas_types::{ClusterCount, EntityId, EntityPosition, MarkerPoint};
use sqlx::Row;

use crate::catalog::{
    self, CLUSTER_COUNT_SQL, LayerQuery, MARKERS_SQL, NEAREST_ROUTE_SQL, UPDATE_POSITION_SQL,
};
use crate::error::DbError;
use crate::postgres::PostgresPool;

/// Operations the HTTP layer needs from the spatial engine.
///
/// All geometry results are opaque GeoJSON values produced by the engine;
/// empty source tables yield null geometries, which pass through unchanged.
#[async_trait]
pub trait SpatialEngine: Send + Sync {
    /// Execute a catalog query and return its single-row `geojson` payload.
    async fn layer(&self, query: &LayerQuery) -> Result<serde_json::Value, DbError>;

    /// Return the coordinates of every tracked entity.
    async fn markers(&self) -> Result<Vec<MarkerPoint>, DbError>;

    /// Move a tracked entity to `POINT(lon lat)` in SRID 4326 and echo the
    /// updated row.
    async fn update_position(
        &self,
        id: EntityId,
        lat: f64,
        lon: f64,
    ) -> Result<EntityPosition, DbError>;

    /// Count the points sharing a DBSCAN cluster with the watched entity.
    /// Returns zero rows when the entity is unclustered.
    async fn cluster_count(&self, id: EntityId) -> Result<Vec<ClusterCount>, DbError>;

    /// Shortest path from the graph vertex nearest the watched entity to
    /// the catalog's target vertex, one `{geojson}` object per result row.
    async fn nearest_route(&self, id: EntityId) -> Result<Vec<serde_json::Value>, DbError>;
}

/// Log an engine failure with the identity of the failing template, then
/// hand the classified error back to the caller.
fn trace_failure(name: &str, e: sqlx::Error) -> DbError {
    let err = DbError::from(e);
    match &err {
        DbError::Query(_) => tracing::error!(query = name, error = %err, "engine rejected query"),
        _ => tracing::warn!(query = name, error = %err, "engine unreachable"),
    }
    err
}

#[async_trait]
impl SpatialEngine for PostgresPool {
    async fn layer(&self, query: &LayerQuery) -> Result<serde_json::Value, DbError> {
        let row = sqlx::query(query.sql)
            .fetch_one(self.pool())
            .await
            .map_err(|e| trace_failure(query.name, e))?;

        let geojson: Option<serde_json::Value> = row
            .try_get("geojson")
            .map_err(|e| trace_failure(query.name, e))?;
        Ok(geojson.unwrap_or(serde_json::Value::Null))
    }

    async fn markers(&self) -> Result<Vec<MarkerPoint>, DbError> {
        let rows = sqlx::query_as::<_, MarkerRow>(MARKERS_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(|e| trace_failure("markers", e))?;
        Ok(rows.into_iter().map(MarkerRow::into_marker).collect())
    }

    async fn update_position(
        &self,
        id: EntityId,
        lat: f64,
        lon: f64,
    ) -> Result<EntityPosition, DbError> {
        // WKT stores longitude first; callers supply (lat, lon).
        let point = format!("POINT({lon} {lat})");

        let row = sqlx::query_as::<_, PositionRow>(UPDATE_POSITION_SQL)
            .bind(&point)
            .bind(id.into_inner())
            .fetch_one(self.pool())
            .await
            .map_err(|e| trace_failure("update_position", e))?;

        tracing::info!(entity = %id, lon, lat, "entity position updated");
        Ok(row.into_position())
    }

    async fn cluster_count(&self, id: EntityId) -> Result<Vec<ClusterCount>, DbError> {
        let rows = sqlx::query_as::<_, ClusterRow>(CLUSTER_COUNT_SQL)
            .bind(id.into_inner())
            .fetch_all(self.pool())
            .await
            .map_err(|e| trace_failure("cluster_count", e))?;
        Ok(rows.into_iter().map(ClusterRow::into_count).collect())
    }

    async fn nearest_route(&self, id: EntityId) -> Result<Vec<serde_json::Value>, DbError> {
        let rows = sqlx::query(NEAREST_ROUTE_SQL)
            .bind(id.into_inner())
            .bind(catalog::ROUTE_TARGET_VERTEX)
            .fetch_all(self.pool())
            .await
            .map_err(|e| trace_failure("nearest_route", e))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let geojson: Option<serde_json::Value> = row
                .try_get("geojson")
                .map_err(|e| trace_failure("nearest_route", e))?;
            results.push(serde_json::json!({
                "geojson": geojson.unwrap_or(serde_json::Value::Null),
            }));
        }
        Ok(results)
    }
}

/// Row projection for [`MARKERS_SQL`].
#[derive(sqlx::FromRow)]
struct MarkerRow {
    x: f64,
    y: f64,
}

impl MarkerRow {
    fn into_marker(self) -> MarkerPoint {
        MarkerPoint {
            x: self.x,
            y: self.y,
        }
    }
}

/// Row projection for [`UPDATE_POSITION_SQL`].
#[derive(sqlx::FromRow)]
struct PositionRow {
    id: i64,
    x: f64,
    y: f64,
    geom: serde_json::Value,
}

impl PositionRow {
    fn into_position(self) -> EntityPosition {
        EntityPosition {
            id: EntityId(self.id),
            x: self.x,
            y: self.y,
            geom: self.geom,
        }
    }
}

/// Row projection for [`CLUSTER_COUNT_SQL`].
#[derive(sqlx::FromRow)]
struct ClusterRow {
    num_points_in_cluster: i64,
}

impl ClusterRow {
    const fn into_count(self) -> ClusterCount {
        ClusterCount {
            num_points_in_cluster: self.num_points_in_cluster,
        }
    }
}
