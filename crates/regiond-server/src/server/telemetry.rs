//! # Logging and Tracing
//!
//! Logs always go to stdout through `tracing_subscriber`: JSON lines by
//! default, human-readable pretty output when `--debug` is set. `RUST_LOG`
//! overrides the level (`info`, or `debug` with `--debug`).
//!
//! ## Feature matrix
//!
//! - `otel`: exports spans through OpenTelemetry.
//! - `honeycomb`: OTLP/gRPC exporter to Honeycomb.
//! - `stdout`: OpenTelemetry stdout exporter.
//!
//! Exporters require `otel`. Both exporters can be enabled at once.
//!
//! ```bash
//! cargo run --features otel,honeycomb -- --dbpath world.geojson
//! ```
//!
//! Latency metrics do not go through OpenTelemetry; they are scraped from
//! `/metrics` (see [`metrics`](crate::server::metrics)).

#[cfg(all(any(feature = "honeycomb", feature = "stdout"), not(feature = "otel")))]
compile_error!("The 'honeycomb' and 'stdout' exporters require the 'otel' feature.");

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "honeycomb")]
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithTonicConfig};
#[cfg(feature = "honeycomb")]
use tonic::{metadata::MetadataMap, transport::ClientTlsConfig};

#[cfg(feature = "otel")]
use opentelemetry::{InstrumentationScope, KeyValue, trace::TracerProvider};
#[cfg(feature = "otel")]
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator, trace as sdktrace};
#[cfg(feature = "otel")]
use opentelemetry_semantic_conventions as semvcns;

use crate::server::config::BUILD_VERSION;

pub struct TelemetryProviders {
    #[cfg(feature = "otel")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
}

impl TelemetryProviders {
    /// Flushes and stops exporters. Logs keep working afterwards.
    pub fn shutdown(self) {
        #[cfg(feature = "otel")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {:#?}", err);
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {:#?}", err);
            }
        }
    }
}

pub fn init_telemetry(debug: bool) -> anyhow::Result<TelemetryProviders> {
    let default_level = if debug { "debug" } else { "info" };

    let pretty = debug.then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_ids(true)
            .with_line_number(true)
            .with_target(false)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
            .with_file(true)
            .pretty()
    });
    let json = (!debug).then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_ids(true)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .json()
            .flatten_event(true)
    });

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(pretty)
        .with(json);

    #[cfg(feature = "otel")]
    let (registry, tracer_provider) = {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        let tracer_provider = init_tracer()?;
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());

        let scope = InstrumentationScope::builder("regiond")
            .with_version(BUILD_VERSION)
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();

        let registry = registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope))
                .with_error_records_to_exceptions(true),
        );
        (registry, tracer_provider)
    };

    registry.try_init()?;
    tracing::debug!(version = BUILD_VERSION, "telemetry initialized");

    Ok(TelemetryProviders {
        #[cfg(feature = "otel")]
        tracer_provider,
    })
}

#[cfg(feature = "otel")]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("regiond")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                BUILD_VERSION,
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "honeycomb")]
fn honeycomb_metadata() -> anyhow::Result<MetadataMap> {
    use anyhow::Context;

    let mut map = MetadataMap::new();
    let api_key = std::env::var("HONEYCOMB_API_KEY").context("missing `HONEYCOMB_API_KEY`")?;
    let dataset = std::env::var("HONEYCOMB_DATASET").context("missing `HONEYCOMB_DATASET`")?;
    map.insert(
        "x-honeycomb-team",
        api_key.parse().context("invalid API key")?,
    );
    map.insert(
        "x-honeycomb-dataset",
        dataset.parse().context("invalid dataset")?,
    );
    Ok(map)
}

#[cfg(feature = "otel")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = builder.with_span_processor(
        sdktrace::BatchSpanProcessor::builder(opentelemetry_stdout::SpanExporter::default())
            .with_batch_config(batch_config())
            .build(),
    );

    #[cfg(feature = "honeycomb")]
    let builder = {
        use anyhow::Context;
        use std::str::FromStr;

        let endpoint =
            std::env::var("HONEYCOMB_ENDPOINT").context("missing `HONEYCOMB_ENDPOINT`")?;
        let compression = std::env::var("HONEYCOMB_COMPRESSION")
            .context("missing `HONEYCOMB_COMPRESSION`")?
            .to_ascii_lowercase();

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_tls_config(ClientTlsConfig::new().with_native_roots())
            .with_metadata(honeycomb_metadata()?)
            .with_timeout(std::time::Duration::from_secs(10))
            .with_compression(Compression::from_str(&compression)?)
            .with_endpoint(endpoint)
            .with_protocol(Protocol::Grpc)
            .build()
            .context("failed to build tracer exporter")?;

        builder.with_span_processor(
            sdktrace::BatchSpanProcessor::builder(exporter)
                .with_batch_config(batch_config())
                .build(),
        )
    };

    Ok(builder.build())
}

#[cfg(all(feature = "otel", any(feature = "stdout", feature = "honeycomb")))]
fn batch_config() -> sdktrace::BatchConfig {
    sdktrace::BatchConfigBuilder::default()
        .with_scheduled_delay(std::time::Duration::from_secs(5))
        .with_max_queue_size(2048)
        .build()
}
