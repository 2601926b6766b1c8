//! The geofence store capability consumed by the query service.

use crate::{
    Result,
    types::{Coordinate, RegionMatch},
};
use std::sync::Arc;

/// A point-in-region index.
///
/// Implementations own their resources and are opened once per process.
/// `query` is called concurrently from every in-flight request without any
/// caller-side locking, so implementations handle their own synchronization.
/// The server invokes it from a blocking thread pool, never from an async
/// worker, so implementations may perform blocking I/O.
pub trait GeofenceStore: Send + Sync {
    /// Returns every region containing `at`, most authoritative first.
    ///
    /// A point outside every region yields an empty vector, not an error.
    /// Errors are reserved for genuine lookup failures and fail only the
    /// request that triggered them.
    fn query(&self, at: Coordinate) -> Result<Vec<RegionMatch>>;
}

impl<S: GeofenceStore + ?Sized> GeofenceStore for Arc<S> {
    fn query(&self, at: Coordinate) -> Result<Vec<RegionMatch>> {
        (**self).query(at)
    }
}
