//! REST endpoint handlers for the API server.
//!
//! The on-demand layer endpoints all go through [`layer`], driven by the
//! static catalog; only the mutation, marker, and derived-result endpoints
//! have dedicated handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/data` | Move the watched entity |
//! | `GET` | *(catalog paths)* | On-demand spatial layer queries |
//! | `GET` | `/allMarker` | Coordinates of every tracked entity |
//! | `GET` | `/clusterResult` | Cached-or-fresh cluster membership |
//! | `GET` | `/realSource` | Cached-or-fresh nearest-vertex route |

use std::sync::Arc;

use atlas_db::{LAYER_QUERIES, LayerQuery};
use atlas_types::{EntityPosition, MarkerPoint};
use axum::Json;
use axum::extract::State;
use axum::response::Html;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page listing the available endpoints.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let watched = state.watched;
    let layers: String = LAYER_QUERIES
        .iter()
        .map(|q| format!("        <li><a href=\"{0}\">{0}</a></li>\n", q.path))
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Atlas Spatial Query Service</title>
</head>
<body>
    <h1>Atlas Spatial Query Service</h1>
    <p>Watched entity: {watched}</p>

    <h2>Layers</h2>
    <ul>
{layers}    </ul>

    <h2>Entity</h2>
    <ul>
        <li><code>POST /data</code> -- move the watched entity ({{param1: lat, param2: lon}})</li>
        <li><a href="/allMarker">/allMarker</a> -- all tracked entity coordinates</li>
        <li><a href="/clusterResult">/clusterResult</a> -- cluster membership count</li>
        <li><a href="/realSource">/realSource</a> -- route from nearest graph vertex</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET <catalog path> -- on-demand spatial layers
// ---------------------------------------------------------------------------

/// Execute a catalog query and return its GeoJSON payload unchanged.
///
/// Empty source tables yield null geometries inside the payload; they pass
/// through rather than erroring.
pub async fn layer(
    State(state): State<Arc<AppState>>,
    query: &'static LayerQuery,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.engine.layer(query).await?))
}

// ---------------------------------------------------------------------------
// POST /data -- move the watched entity
// ---------------------------------------------------------------------------

/// Update the watched entity's position from a `{param1, param2}` body
/// (latitude then longitude). Both fields must be present and numeric;
/// anything else is rejected before the engine is touched.
pub async fn update_position(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<EntityPosition>, ApiError> {
    let lat = numeric_field(&body, "param1")?;
    let lon = numeric_field(&body, "param2")?;

    let updated = state.engine.update_position(state.watched, lat, lon).await?;
    Ok(Json(updated))
}

// ---------------------------------------------------------------------------
// GET /allMarker -- all tracked entity coordinates
// ---------------------------------------------------------------------------

/// Return the `{x, y}` coordinates of every tracked entity.
pub async fn all_markers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MarkerPoint>>, ApiError> {
    Ok(Json(state.engine.markers().await?))
}

// ---------------------------------------------------------------------------
// GET /clusterResult -- cluster membership count
// ---------------------------------------------------------------------------

/// Serve the cluster membership count for the watched entity.
///
/// Serves the cached value when a notification-driven recompute has
/// populated it; otherwise computes freshly and seeds the cache, so the
/// endpoint works before the first notification fires.
pub async fn cluster_result(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = if let Some(rows) = state.cache.cluster().await {
        rows
    } else {
        let rows = state.engine.cluster_count(state.watched).await?;
        state.cache.set_cluster(rows.clone()).await;
        rows
    };

    Ok(Json(serde_json::json!({ "result": rows })))
}

// ---------------------------------------------------------------------------
// GET /realSource -- route from the vertex nearest the watched entity
// ---------------------------------------------------------------------------

/// Serve the shortest path from the graph vertex nearest the watched
/// entity, with the same cached-or-fresh policy as `/clusterResult`.
pub async fn real_source(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = if let Some(rows) = state.cache.nearest_route().await {
        rows
    } else {
        let rows = state.engine.nearest_route(state.watched).await?;
        state.cache.set_nearest_route(rows.clone()).await;
        rows
    };

    Ok(Json(serde_json::json!({ "result": rows })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract a required numeric field, rejecting missing values, strings,
/// booleans, and nulls.
fn numeric_field(body: &serde_json::Value, name: &str) -> Result<f64, ApiError> {
    body.get(name)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| ApiError::Validation(format!("{name} must be a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_field_accepts_numbers() {
        let body = serde_json::json!({ "param1": 36.6 });
        assert_eq!(numeric_field(&body, "param1").ok(), Some(36.6));
    }

    #[test]
    fn numeric_field_rejects_missing_and_non_numeric() {
        let body = serde_json::json!({ "param1": "36.6", "param2": true });
        assert!(numeric_field(&body, "param1").is_err());
        assert!(numeric_field(&body, "param2").is_err());
        assert!(numeric_field(&body, "param3").is_err());
    }
}
