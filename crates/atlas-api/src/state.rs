//! Shared application state for the API server.
//!
//! [`AppState`] holds the spatial engine handle behind the
//! [`SpatialEngine`] trait seam plus the [`DerivedCache`] of
//! notification-driven results. Handlers read the cache; only the recompute
//! worker (and the cached-or-fresh fallback path) writes it.

use std::sync::Arc;

use atlas_db::SpatialEngine;
use atlas_types::{ClusterCount, EntityId};
use tokio::sync::RwLock;

/// Cache of derived results refreshed by change notifications.
///
/// Each slot starts EMPTY (`None`), becomes VALID on the first successful
/// compute, and is refreshed in place afterwards; it never reverts to
/// EMPTY during normal operation.
#[derive(Debug, Default)]
pub struct DerivedCache {
    cluster: RwLock<Option<Vec<ClusterCount>>>,
    nearest_route: RwLock<Option<Vec<serde_json::Value>>>,
}

impl DerivedCache {
    /// The cached cluster membership rows, if any compute has succeeded.
    pub async fn cluster(&self) -> Option<Vec<ClusterCount>> {
        self.cluster.read().await.clone()
    }

    /// Store freshly computed cluster membership rows.
    pub async fn set_cluster(&self, rows: Vec<ClusterCount>) {
        *self.cluster.write().await = Some(rows);
    }

    /// The cached nearest-route rows, if any compute has succeeded.
    pub async fn nearest_route(&self) -> Option<Vec<serde_json::Value>> {
        self.nearest_route.read().await.clone()
    }

    /// Store freshly computed nearest-route rows.
    pub async fn set_nearest_route(&self, rows: Vec<serde_json::Value>) {
        *self.nearest_route.write().await = Some(rows);
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The engine
/// is held as a trait object so tests can substitute a fake engine and
/// notification source.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the spatial engine (the shared query pool in production).
    pub engine: Arc<dyn SpatialEngine>,
    /// Notification-driven derived results.
    pub cache: Arc<DerivedCache>,
    /// The tracked entity whose derived results this service watches.
    pub watched: EntityId,
}

impl AppState {
    /// Create application state with an empty derived cache.
    pub fn new(engine: Arc<dyn SpatialEngine>, watched: EntityId) -> Self {
        Self {
            engine,
            cache: Arc::new(DerivedCache::default()),
            watched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_starts_empty_and_becomes_valid() {
        let cache = DerivedCache::default();
        assert!(cache.cluster().await.is_none());

        cache
            .set_cluster(vec![ClusterCount {
                num_points_in_cluster: 3,
            }])
            .await;

        let rows = cache.cluster().await.unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().map(|r| r.num_points_in_cluster), Some(3));
    }

    #[tokio::test]
    async fn cache_refreshes_in_place() {
        let cache = DerivedCache::default();
        cache
            .set_cluster(vec![ClusterCount {
                num_points_in_cluster: 3,
            }])
            .await;
        cache
            .set_cluster(vec![ClusterCount {
                num_points_in_cluster: 5,
            }])
            .await;

        let rows = cache.cluster().await.unwrap_or_default();
        assert_eq!(rows.first().map(|r| r.num_points_in_cluster), Some(5));
    }
}
