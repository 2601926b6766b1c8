//! Lookup dispatch and the two network frontends built on it.
//!
//! ## Structure
//!
//! - [`query`] - [`QueryService`](query::QueryService), the shared store
//!   dispatch, timing and fallback policy.
//! - [`handler`] - gRPC entry point (`RegionService`).
//! - [`http`] - axum router for `/query`, `/healthz` and `/metrics`.

pub mod handler;
pub mod http;
pub mod query;
