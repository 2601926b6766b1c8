//! Prometheus metrics shared by both frontends.
//!
//! A single [`MetricsRecorder`] is built at startup and handed to the query
//! service; clones share the same underlying collectors, so gRPC and HTTP
//! requests land in the same histogram. The recorder owns its own
//! [`Registry`] instead of using the process-global default one, which keeps
//! tests isolated from each other.
//!
//! ## Exported series
//!
//! - `regiond_query_processed_delay_seconds` - store round-trip latency of
//!   every successful lookup.
//! - `regiond_requests_total{protocol, outcome}` - handled lookup requests.
//! - `regiond_grpc_server_handling_seconds{grpc_service, grpc_method}` - time
//!   spent in each gRPC handler, store errors included.
//! - `process_*` - CPU, memory and file descriptor usage of the server
//!   process, with the `process` feature on Linux.

use core::time::Duration;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use regiond_core::{Error, Result};

const NAMESPACE: &str = "regiond";

/// Frontend a request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Rpc,
    Http,
}

impl Protocol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rpc => "rpc",
            Self::Http => "http",
        }
    }
}

/// How a lookup request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    BadRequest,
    StoreError,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::BadRequest => "bad_request",
            Self::StoreError => "store_error",
        }
    }
}

#[derive(Clone)]
pub struct MetricsRecorder {
    registry: Registry,
    query_delay: Histogram,
    requests: IntCounterVec,
    grpc_handling: HistogramVec,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let query_delay = Histogram::with_opts(
            HistogramOpts::new(
                "query_processed_delay_seconds",
                "histogram of delays for processing a request",
            )
            .namespace(NAMESPACE),
        )
        .map_err(metrics_error)?;

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "lookup requests handled, by frontend and outcome")
                .namespace(NAMESPACE),
            &["protocol", "outcome"],
        )
        .map_err(metrics_error)?;

        let grpc_handling = HistogramVec::new(
            HistogramOpts::new(
                "grpc_server_handling_seconds",
                "histogram of response latency of gRPC calls handled by the server",
            )
            .namespace(NAMESPACE),
            &["grpc_service", "grpc_method"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(query_delay.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(requests.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(grpc_handling.clone()))
            .map_err(metrics_error)?;

        #[cfg(all(feature = "process", target_os = "linux"))]
        registry
            .register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            query_delay,
            requests,
            grpc_handling,
        })
    }

    /// Adds one latency sample. Called once per successful store round-trip.
    pub fn observe_query(&self, elapsed: Duration) {
        self.query_delay.observe(elapsed.as_secs_f64());
    }

    pub fn record_request(&self, protocol: Protocol, outcome: Outcome) {
        self.requests
            .with_label_values(&[protocol.as_str(), outcome.as_str()])
            .inc();
    }

    /// Adds one gRPC handling-time sample for `service`/`method`.
    pub fn observe_grpc_handling(&self, service: &str, method: &str, elapsed: Duration) {
        self.grpc_handling
            .with_label_values(&[service, method])
            .observe(elapsed.as_secs_f64());
    }

    /// Number of handling-time samples recorded for `service`/`method`.
    pub fn grpc_handling_count(&self, service: &str, method: &str) -> u64 {
        self.grpc_handling
            .with_label_values(&[service, method])
            .get_sample_count()
    }

    /// Number of samples in the latency histogram.
    pub fn query_count(&self) -> u64 {
        self.query_delay.get_sample_count()
    }

    pub fn requests(&self, protocol: Protocol, outcome: Outcome) -> u64 {
        self.requests
            .with_label_values(&[protocol.as_str(), outcome.as_str()])
            .get()
    }

    /// Renders every registered collector in the Prometheus text format.
    pub fn export(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(metrics_error)
    }
}

fn metrics_error(err: impl core::fmt::Display) -> Error {
    Error::Metrics {
        context: err.to_string(),
    }
}
