//! Protocol-independent lookup dispatch.
//!
//! [`QueryService`] is the one place that talks to the store. Both frontends
//! hold a clone of it and only differ in the [`MatchPolicy`] they ask for and
//! in how they render the outcome.

use crate::server::metrics::MetricsRecorder;
use core::time::Duration;
use regiond_core::{
    Error, Result, mapper,
    store::GeofenceStore,
    types::{Coordinate, LookupOutcome, MatchPolicy},
};
use std::{sync::Arc, time::Instant};

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn GeofenceStore>,
    metrics: MetricsRecorder,
}

impl QueryService {
    /// Takes ownership of the store for the lifetime of the process.
    pub fn new(store: impl GeofenceStore + 'static, metrics: MetricsRecorder) -> Self {
        Self {
            store: Arc::new(store),
            metrics,
        }
    }

    /// Queries the store for `at` and resolves the matches under `policy`.
    ///
    /// The store runs on tokio's blocking pool, so a slow store never stalls
    /// the request tasks sharing its worker. On success the store round-trip
    /// time is recorded in the latency histogram exactly once and returned
    /// alongside the outcome. A store error is returned as-is: nothing is
    /// recorded and nothing is retried.
    pub async fn lookup(
        &self,
        at: Coordinate,
        policy: MatchPolicy,
    ) -> Result<(LookupOutcome, Duration)> {
        let store = Arc::clone(&self.store);
        let (matches, elapsed) = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            store.query(at).map(|matches| (matches, start.elapsed()))
        })
        .await
        .map_err(|e| Error::StoreQuery {
            context: format!("store query aborted: {e}"),
        })??;

        self.metrics.observe_query(elapsed);

        Ok((mapper::resolve(policy, matches), elapsed))
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }
}
