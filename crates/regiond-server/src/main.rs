use clap::Parser;
use regiond_server::server::{
    self,
    config::{BUILD_VERSION, CliArgs, ServerConfig},
    lifecycle::{Lifecycle, Phase, shutdown_signal},
    metrics::MetricsRecorder,
    service::query::QueryService,
    store::{FileStore, StoreOptions},
    telemetry::init_telemetry,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit status when the gRPC port cannot be bound.
const EXIT_RPC_BIND: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    if args.version {
        println!("{BUILD_VERSION}");
        return Ok(());
    }

    let config = ServerConfig::try_from(args)?;
    let providers = init_telemetry(config.debug)?;
    let lifecycle = Arc::new(Lifecycle::new());
    log_startup_info(&config);

    lifecycle.advance(Phase::StoreOpening);
    let store = FileStore::open(
        &config.dbpath,
        StoreOptions {
            cached_entries: config.cached_entries,
            debug: config.debug,
        },
    )?;
    let query = QueryService::new(store, MetricsRecorder::new()?);

    let rpc_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.grpc_port));
    let rpc_listener = match TcpListener::bind(rpc_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%rpc_addr, "failed to listen on {}: {}", config.grpc_port, e);
            providers.shutdown();
            std::process::exit(EXIT_RPC_BIND);
        }
    };

    tokio::spawn({
        let lifecycle = Arc::clone(&lifecycle);
        async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, terminating gracefully...");
            lifecycle.begin_shutdown();
        }
    });

    let http_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.http_port));
    let res = server::run(rpc_listener, http_addr, query, lifecycle).await;

    tracing::info!("Service shut down");
    providers.shutdown();
    res
}

fn log_startup_info(config: &ServerConfig) {
    if config.debug {
        tracing::debug!("Starting regiond {} with full config: {:#?}", BUILD_VERSION, config);
    } else {
        tracing::info!(
            version = BUILD_VERSION,
            dbpath = %config.dbpath.display(),
            http_port = config.http_port,
            grpc_port = config.grpc_port,
            "Starting regiond"
        );
    }
}
