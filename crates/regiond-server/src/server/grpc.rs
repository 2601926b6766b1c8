//! gRPC server assembly.
//!
//! Alongside `RegionLookup` the server exposes the standard health service,
//! reflection (v1) and gRPC-Web with permissive CORS, all on one port.

use crate::server::service::handler::RegionService;
use regiond_core::proto::{FILE_DESCRIPTOR_SET, region_lookup_server::RegionLookupServer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Serves gRPC on `incoming` until `shutdown` is cancelled.
///
/// The health service reports `RegionLookup` as serving for as long as the
/// listener runs and flips to not-serving as soon as shutdown begins, before
/// in-flight calls drain.
pub async fn serve<I, IO, IE>(
    incoming: I,
    service: RegionService,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<RegionLookupServer<RegionService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let signal = async move {
        shutdown.cancelled().await;
        health_reporter
            .set_not_serving::<RegionLookupServer<RegionService>>()
            .await;
        tracing::info!("gRPC listener draining");
    };

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_region_service(service))
        .serve_with_incoming_shutdown(incoming, signal)
        .await?;

    Ok(())
}

fn build_region_service(service: RegionService) -> RegionLookupServer<RegionService> {
    RegionLookupServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
}
