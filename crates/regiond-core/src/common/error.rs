//! Error types for the region lookup service.
//!
//! This module defines the central `Error` enum shared by the store, the query
//! service and both network frontends. It implements `From<Error>` for
//! `tonic::Status` so handlers can propagate failures to gRPC clients with `?`.
//!
//! ## Error Cases
//! - `StoreOpen`: the geofence store could not be opened at startup.
//! - `StoreQuery`: the store failed while answering a lookup.
//! - `InvalidCoordinate`: a client supplied a coordinate that does not parse.
//! - `Metrics`: the metrics registry could not be encoded.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the region lookup service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The store backing the service could not be opened.
    #[error("failed to open store at {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    /// A lookup failed inside the store.
    #[error("store query failed: {context}")]
    StoreQuery { context: String },

    /// A request parameter is not a valid coordinate.
    #[error("{reason}")]
    InvalidCoordinate { reason: String },

    /// Encoding the metrics exposition failed.
    #[error("metrics error: {context}")]
    Metrics { context: String },
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::StoreOpen { .. } => Status::unavailable(err.to_string()),
            Error::StoreQuery { .. } | Error::Metrics { .. } => Status::internal(err.to_string()),
            Error::InvalidCoordinate { reason } => Status::invalid_argument(reason),
        }
    }
}
