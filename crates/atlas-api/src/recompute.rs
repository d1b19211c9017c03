//! Recompute worker for notification-driven derived results.
//!
//! Consumes [`ChangeEvent`]s from the listener's channel and refreshes
//! every derived result that depends on the watched table. Refreshes run on
//! spawned tasks so one slow engine query never blocks the worker from
//! receiving the next notification.
//!
//! Per key there is at most one refresh in flight. A notification arriving
//! while a refresh runs sets a superseded flag; the running task then
//! performs exactly one trailing refresh when it finishes. This serializes
//! recomputation per key without unbounded queueing: N notifications during
//! one refresh cost one extra refresh, not N.
//!
//! A failed refresh is logged and leaves the previous cache value in place.
//! Recomputing a key is idempotent for a given entity state, so the
//! trailing refresh is always safe.

use std::sync::Arc;

use atlas_db::SpatialEngine;
use atlas_types::{ChangeEvent, EntityId};
use tokio::sync::{Mutex, mpsc};

use crate::state::DerivedCache;

/// The derived results a change notification can invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKey {
    /// DBSCAN cluster membership count for the watched entity.
    ClusterCount,
    /// Shortest path from the vertex nearest the watched entity.
    NearestRoute,
}

impl DerivedKey {
    /// Every key, in refresh order.
    pub const ALL: [Self; 2] = [Self::ClusterCount, Self::NearestRoute];
}

/// In-flight bookkeeping for one derived key.
#[derive(Debug, Default)]
struct Flight {
    in_flight: bool,
    superseded: bool,
}

/// One flight record per derived key.
#[derive(Debug, Default)]
struct Flights {
    cluster: Mutex<Flight>,
    nearest_route: Mutex<Flight>,
}

impl Flights {
    const fn get(&self, key: DerivedKey) -> &Mutex<Flight> {
        match key {
            DerivedKey::ClusterCount => &self.cluster,
            DerivedKey::NearestRoute => &self.nearest_route,
        }
    }
}

/// Worker that turns change notifications into cache refreshes.
#[derive(Clone)]
pub struct RecomputeWorker {
    engine: Arc<dyn SpatialEngine>,
    cache: Arc<DerivedCache>,
    watched: EntityId,
    flights: Arc<Flights>,
}

impl RecomputeWorker {
    /// Create a worker refreshing derived results for `watched`.
    pub fn new(engine: Arc<dyn SpatialEngine>, cache: Arc<DerivedCache>, watched: EntityId) -> Self {
        Self {
            engine,
            cache,
            watched,
            flights: Arc::new(Flights::default()),
        }
    }

    /// Consume change events until the sender side is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<ChangeEvent>) {
        while let Some(event) = rx.recv().await {
            tracing::debug!(
                channel = event.channel,
                received_at = %event.received_at,
                "scheduling derived-result refresh"
            );
            for key in DerivedKey::ALL {
                self.schedule(key).await;
            }
        }
        tracing::info!("change event channel closed, recompute worker stopping");
    }

    /// Schedule a refresh of `key`, coalescing with any refresh in flight.
    async fn schedule(&self, key: DerivedKey) {
        {
            let mut flight = self.flights.get(key).lock().await;
            if flight.in_flight {
                flight.superseded = true;
                return;
            }
            flight.in_flight = true;
        }

        let engine = Arc::clone(&self.engine);
        let cache = Arc::clone(&self.cache);
        let flights = Arc::clone(&self.flights);
        let watched = self.watched;

        tokio::spawn(async move {
            loop {
                refresh(key, engine.as_ref(), &cache, watched).await;

                let mut flight = flights.get(key).lock().await;
                if flight.superseded {
                    // A notification landed mid-refresh: run once more.
                    flight.superseded = false;
                } else {
                    flight.in_flight = false;
                    break;
                }
            }
        });
    }

    /// Whether no refresh is currently in flight for `key` (test hook).
    #[cfg(test)]
    async fn is_idle(&self, key: DerivedKey) -> bool {
        !self.flights.get(key).lock().await.in_flight
    }
}

/// Recompute one derived result and store it, keeping the previous value
/// on failure.
async fn refresh(key: DerivedKey, engine: &dyn SpatialEngine, cache: &DerivedCache, watched: EntityId) {
    match key {
        DerivedKey::ClusterCount => match engine.cluster_count(watched).await {
            Ok(rows) => {
                tracing::debug!(rows = rows.len(), "cluster count refreshed");
                cache.set_cluster(rows).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cluster refresh failed, keeping previous value");
            }
        },
        DerivedKey::NearestRoute => match engine.nearest_route(watched).await {
            Ok(rows) => {
                tracing::debug!(rows = rows.len(), "nearest route refreshed");
                cache.set_nearest_route(rows).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "route refresh failed, keeping previous value");
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use atlas_db::{DbError, LayerQuery};
    use atlas_types::{ClusterCount, EntityPosition, MarkerPoint};

    use super::*;

    /// Fake engine that counts cluster queries and can be made slow or
    /// broken.
    #[derive(Default)]
    struct CountingEngine {
        cluster_calls: AtomicUsize,
        route_calls: AtomicUsize,
        delay_ms: u64,
        fail: AtomicBool,
    }

    #[async_trait]
    impl SpatialEngine for CountingEngine {
        async fn layer(&self, _query: &LayerQuery) -> Result<serde_json::Value, DbError> {
            Ok(serde_json::Value::Null)
        }

        async fn markers(&self) -> Result<Vec<MarkerPoint>, DbError> {
            Ok(Vec::new())
        }

        async fn update_position(
            &self,
            id: EntityId,
            lat: f64,
            lon: f64,
        ) -> Result<EntityPosition, DbError> {
            Ok(EntityPosition {
                id,
                x: lon,
                y: lat,
                geom: serde_json::Value::Null,
            })
        }

        async fn cluster_count(&self, _id: EntityId) -> Result<Vec<ClusterCount>, DbError> {
            let call = self.cluster_calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(DbError::Config("engine down".to_owned()));
            }
            Ok(vec![ClusterCount {
                num_points_in_cluster: i64::try_from(call).unwrap_or(0),
            }])
        }

        async fn nearest_route(&self, _id: EntityId) -> Result<Vec<serde_json::Value>, DbError> {
            self.route_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![serde_json::json!({ "geojson": null })])
        }
    }

    fn make_worker(engine: Arc<CountingEngine>) -> (RecomputeWorker, Arc<DerivedCache>) {
        let cache = Arc::new(DerivedCache::default());
        let worker = RecomputeWorker::new(engine, Arc::clone(&cache), EntityId(5834));
        (worker, cache)
    }

    #[tokio::test]
    async fn event_refreshes_both_derived_results() {
        let engine = Arc::new(CountingEngine::default());
        let (worker, cache) = make_worker(Arc::clone(&engine));

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(worker.clone().run(rx));

        tx.send(ChangeEvent::now("car_changes", "")).await.ok();
        drop(tx);
        handle.await.ok();

        // Wait for the spawned refresh tasks to land.
        for _ in 0..50 {
            if cache.cluster().await.is_some() && cache.nearest_route().await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(cache.cluster().await.is_some());
        assert!(cache.nearest_route().await.is_some());
        assert_eq!(engine.cluster_calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.route_calls.load(Ordering::SeqCst), 1);
        assert!(worker.is_idle(DerivedKey::ClusterCount).await);
    }

    #[tokio::test]
    async fn burst_of_events_coalesces_to_one_trailing_refresh() {
        let engine = Arc::new(CountingEngine {
            delay_ms: 50,
            ..CountingEngine::default()
        });
        let (worker, _cache) = make_worker(Arc::clone(&engine));

        // Three schedules while the first refresh sleeps: one starts the
        // flight, the rest only mark it superseded.
        for _ in 0..3 {
            worker.schedule(DerivedKey::ClusterCount).await;
        }

        for _ in 0..50 {
            if worker.is_idle(DerivedKey::ClusterCount).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(worker.is_idle(DerivedKey::ClusterCount).await);
        assert_eq!(engine.cluster_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_value() {
        let engine = Arc::new(CountingEngine::default());
        let (worker, cache) = make_worker(Arc::clone(&engine));

        cache
            .set_cluster(vec![ClusterCount {
                num_points_in_cluster: 7,
            }])
            .await;

        engine.fail.store(true, Ordering::SeqCst);
        worker.schedule(DerivedKey::ClusterCount).await;

        for _ in 0..50 {
            if worker.is_idle(DerivedKey::ClusterCount).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let rows = cache.cluster().await.unwrap_or_default();
        assert_eq!(rows.first().map(|r| r.num_points_in_cluster), Some(7));
    }
}
