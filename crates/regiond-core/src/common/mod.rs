//! Types shared between the lookup service and its clients.
//!
//! - [`types`] - coordinates, region matches and lookup outcomes.
//! - [`store`] - the [`GeofenceStore`](store::GeofenceStore) capability.
//! - [`mapper`] - per-protocol translation of store results.
//! - [`error`] - the crate-wide [`Error`] type.

pub mod error;
pub mod mapper;
pub mod store;
pub mod types;

pub use error::{Error, Result};
