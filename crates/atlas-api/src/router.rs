//! Axum router construction for the API server.
//!
//! The route table is built exactly once, before the server starts: the
//! catalog's on-demand endpoints are added in a loop, the mutation and
//! derived-result endpoints by hand. Change notifications only ever touch
//! the derived cache, never this table.

use std::sync::Arc;

use atlas_db::LAYER_QUERIES;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the API server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `POST /data` -- move the watched entity
/// - `GET` routes for every catalog layer query
/// - `GET /allMarker` -- all tracked entity coordinates
/// - `GET /clusterResult` -- cached-or-fresh cluster membership
/// - `GET /realSource` -- cached-or-fresh nearest-vertex route
///
/// CORS is configured to allow any origin for development. In production
/// this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Mutation endpoint (the event source for change notifications)
        .route("/data", post(handlers::update_position))
        // Entity and derived-result endpoints
        .route("/allMarker", get(handlers::all_markers))
        .route("/clusterResult", get(handlers::cluster_result))
        .route("/realSource", get(handlers::real_source));

    // On-demand layer endpoints, straight from the catalog.
    for query in LAYER_QUERIES {
        router = router.route(
            query.path,
            get(move |state: State<Arc<AppState>>| handlers::layer(state, query)),
        );
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
