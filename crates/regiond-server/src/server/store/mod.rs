//! Store backends.
//!
//! - [`file`] - [`FileStore`](file::FileStore), a GeoJSON-backed store loaded
//!   fully into memory.

pub mod file;

pub use file::{FileStore, StoreOptions};

#[cfg(test)]
pub(crate) mod mock {
    use regiond_core::{
        Error, Result,
        store::GeofenceStore,
        types::{Coordinate, RegionMatch},
    };
    use core::time::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted store for handler tests.
    ///
    /// `Fixed` answers every query with the same matches, `Failing` errors on
    /// every query, `Echo` returns one match whose attributes encode the
    /// queried coordinate, `Slow` blocks its thread before answering with no
    /// matches.
    pub enum MockStore {
        Fixed(Vec<RegionMatch>),
        Failing(String),
        Echo,
        Slow(Duration),
    }

    pub struct CountingStore {
        pub inner: MockStore,
        pub calls: AtomicUsize,
    }

    impl CountingStore {
        pub fn new(inner: MockStore) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GeofenceStore for CountingStore {
        fn query(&self, at: Coordinate) -> Result<Vec<RegionMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.inner {
                MockStore::Fixed(matches) => Ok(matches.clone()),
                MockStore::Failing(context) => Err(Error::StoreQuery {
                    context: context.clone(),
                }),
                MockStore::Echo => Ok(vec![RegionMatch::from_iter([
                    ("iso", format!("{}:{}", at.lat, at.lng)),
                    ("lat", at.lat.to_string()),
                    ("lng", at.lng.to_string()),
                ])]),
                MockStore::Slow(delay) => {
                    std::thread::sleep(*delay);
                    Ok(vec![])
                }
            }
        }
    }
}
