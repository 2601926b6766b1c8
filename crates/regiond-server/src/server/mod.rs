//! Server-side building blocks and the listener orchestration.
//!
//! - [`config`] - CLI/environment options and validated [`ServerConfig`](config::ServerConfig).
//! - [`store`] - concrete [`GeofenceStore`](regiond_core::store::GeofenceStore) backends.
//! - [`metrics`] - Prometheus latency histogram and request counters.
//! - [`service`] - query dispatch, gRPC handler and HTTP routes.
//! - [`grpc`] - tonic server assembly (health, reflection, gRPC-Web).
//! - [`lifecycle`] - startup phases and the shared shutdown token.
//! - [`telemetry`] - logging and optional OpenTelemetry export.

pub mod config;
pub mod grpc;
pub mod lifecycle;
pub mod metrics;
pub mod service;
pub mod store;
pub mod telemetry;

use lifecycle::{Lifecycle, Phase};
use service::{handler::RegionService, http, query::QueryService};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

/// Runs both listeners until the lifecycle's shutdown token is cancelled.
///
/// The gRPC listener is already bound by the caller, so a port conflict there
/// is reported before anything starts. The HTTP listener binds inside its own
/// task: if that fails the error is logged and gRPC keeps serving alone.
///
/// Returns once gRPC has drained and the HTTP task has finished. If the gRPC
/// server stops on its own, shutdown is triggered for HTTP as well.
pub async fn run(
    rpc_listener: TcpListener,
    http_addr: SocketAddr,
    query: QueryService,
    lifecycle: Arc<Lifecycle>,
) -> anyhow::Result<()> {
    let shutdown = lifecycle.shutdown_token();

    let http_task = tokio::spawn(http::bind_and_serve(
        http_addr,
        query.clone(),
        shutdown.clone(),
    ));

    tracing::info!(addr = %rpc_listener.local_addr()?, "listening gRPC");
    lifecycle.advance(Phase::Serving);

    let rpc = grpc::serve(
        TcpListenerStream::new(rpc_listener),
        RegionService::new(query),
        shutdown,
    )
    .await;

    if let Err(e) = &rpc {
        tracing::error!("gRPC listener stopped: {:#}", e);
    }
    lifecycle.begin_shutdown();

    if let Err(e) = http_task.await {
        tracing::error!("HTTP task failed: {}", e);
    }

    tracing::info!("listeners stopped");
    rpc
}
