//! JSON-over-HTTP frontend.
//!
//! ## Routes
//!
//! - `GET /query?lat=<f64>&lng=<f64>` - attributes of the first region
//!   containing the point, or `{"name":"unknown"}`.
//! - `GET /healthz` - build version and a static `"OK"`; never touches the
//!   store.
//! - `GET /metrics` - Prometheus text exposition.

use crate::server::{
    config::BUILD_VERSION,
    metrics::{Outcome, Protocol},
    service::query::QueryService,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use regiond_core::{
    Error, mapper,
    types::{Coordinate, MatchPolicy},
};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub fn router(query: QueryService) -> Router {
    Router::new()
        .route("/query", get(query_region))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(query)
}

/// Binds `addr` and serves until `shutdown` is cancelled.
///
/// Bind and serve failures are logged and swallowed: the HTTP side is not
/// allowed to take the process down.
pub async fn bind_and_serve(addr: SocketAddr, query: QueryService, shutdown: CancellationToken) {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, "failed to bind HTTP listener: {}", e);
            return;
        }
    };

    tracing::info!(%addr, "listening HTTP (metrics & API)");
    if let Err(e) = serve(listener, query, shutdown).await {
        tracing::error!(%addr, "HTTP listener stopped: {}", e);
    }
}

/// Serves the HTTP routes on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    query: QueryService,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(query))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

async fn query_region(
    State(query): State<QueryService>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let metrics = query.metrics();

    let at = match parse_coordinate(&params) {
        Ok(at) => at,
        Err(e) => {
            metrics.record_request(Protocol::Http, Outcome::BadRequest);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match query.lookup(at, MatchPolicy::FullAttributes).await {
        Ok((outcome, elapsed)) => {
            metrics.record_request(Protocol::Http, Outcome::Ok);
            tracing::debug!(lat = at.lat, lng = at.lng, ?elapsed, "resolved region");
            Json(mapper::json_fields(outcome)).into_response()
        }
        Err(e) => {
            metrics.record_request(Protocol::Http, Outcome::StoreError);
            tracing::warn!(lat = at.lat, lng = at.lng, "lookup failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Latitude first, so a request with both parameters broken reports `lat`.
fn parse_coordinate(params: &[(String, String)]) -> regiond_core::Result<Coordinate> {
    let lat = parse_param(params, "lat")?;
    let lng = parse_param(params, "lng")?;
    Ok(Coordinate::new(lat, lng))
}

/// The first occurrence of a repeated parameter wins.
fn parse_param(params: &[(String, String)], name: &str) -> regiond_core::Result<f64> {
    let raw = params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();
    raw.parse().map_err(|e| Error::InvalidCoordinate {
        reason: format!("invalid {name} {raw:?}: {e}"),
    })
}

#[derive(Serialize)]
struct Health {
    version: &'static str,
    status: &'static str,
}

async fn healthz() -> Json<Health> {
    Json(Health {
        version: BUILD_VERSION,
        status: "OK",
    })
}

async fn metrics(State(query): State<QueryService>) -> Response {
    match query.metrics().export() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!("failed to export metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{
        metrics::MetricsRecorder,
        store::mock::{CountingStore, MockStore},
    };
    use axum::{body::Body, http::Request};
    use regiond_core::types::RegionMatch;
    use serde_json::Value;
    use std::{collections::HashMap, sync::Arc};
    use tower::ServiceExt;

    fn setup(store: MockStore) -> (Arc<CountingStore>, QueryService) {
        let store = Arc::new(CountingStore::new(store));
        let query = QueryService::new(Arc::clone(&store), MetricsRecorder::new().unwrap());
        (store, query)
    }

    async fn get(query: &QueryService, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let res = router(query.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn match_returns_every_attribute_as_json() {
        let (_, query) = setup(MockStore::Fixed(vec![RegionMatch::from_iter([
            ("iso", "FR"),
            ("name", "France"),
        ])]));

        let (status, content_type, body) = get(&query, "/query?lat=48.85&lng=2.35").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let json: HashMap<String, String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.len(), 2);
        assert_eq!(json["iso"], "FR");
        assert_eq!(json["name"], "France");
        assert_eq!(query.metrics().query_count(), 1);
    }

    #[tokio::test]
    async fn json_body_lists_attributes_by_name() {
        let (_, query) = setup(MockStore::Fixed(vec![RegionMatch::from_iter([
            ("name", "France"),
            ("iso", "FR"),
            ("capital", "Paris"),
        ])]));

        let (_, _, first) = get(&query, "/query?lat=48.85&lng=2.35").await;
        let (_, _, second) = get(&query, "/query?lat=48.85&lng=2.35").await;

        assert_eq!(
            String::from_utf8(first.clone()).unwrap(),
            r#"{"capital":"Paris","iso":"FR","name":"France"}"#
        );
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn repeated_parameter_uses_first_value() {
        let (store, query) = setup(MockStore::Echo);

        let (status, _, body) = get(&query, "/query?lat=1.5&lat=abc&lng=2&lng=9").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["lat"], "1.5");
        assert_eq!(json["lng"], "2");
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn repeated_parameter_with_bad_first_value_is_rejected() {
        let (store, query) = setup(MockStore::Echo);

        let (status, _, body) = get(&query, "/query?lat=abc&lat=1.5&lng=2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("invalid lat \"abc\""));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn match_without_iso_still_returns_attributes() {
        let (_, query) = setup(MockStore::Fixed(vec![RegionMatch::from_iter([(
            "name", "Gulf of Lion",
        )])]));

        let (status, _, body) = get(&query, "/query?lat=43&lng=4").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Gulf of Lion"}));
    }

    #[tokio::test]
    async fn no_match_is_unknown_name() {
        let (_, query) = setup(MockStore::Fixed(vec![]));

        let (status, _, body) = get(&query, "/query?lat=0&lng=0").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"name": "unknown"}));
        assert_eq!(query.metrics().query_count(), 1);
    }

    #[tokio::test]
    async fn unparsable_lat_is_rejected_before_the_store() {
        let (store, query) = setup(MockStore::Fixed(vec![]));

        let (status, _, body) = get(&query, "/query?lat=abc&lng=2.0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("invalid lat \"abc\""), "body: {body}");
        assert_eq!(store.calls(), 0);
        assert_eq!(query.metrics().query_count(), 0);
        assert_eq!(
            query.metrics().requests(Protocol::Http, Outcome::BadRequest),
            1
        );
    }

    #[tokio::test]
    async fn missing_lng_is_rejected() {
        let (store, query) = setup(MockStore::Fixed(vec![]));

        let (status, _, body) = get(&query, "/query?lat=1.0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("invalid lng \"\""));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn lat_is_validated_before_lng() {
        let (_, query) = setup(MockStore::Fixed(vec![]));

        let (_, _, body) = get(&query, "/query?lat=north&lng=east").await;

        assert!(String::from_utf8(body).unwrap().starts_with("invalid lat"));
    }

    #[tokio::test]
    async fn store_error_is_a_server_error_without_sample() {
        let (_, query) = setup(MockStore::Failing("region bucket missing".to_string()));

        let (status, _, body) = get(&query, "/query?lat=1&lng=1").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            String::from_utf8(body)
                .unwrap()
                .contains("region bucket missing")
        );
        assert_eq!(query.metrics().query_count(), 0);
    }

    #[tokio::test]
    async fn healthz_never_touches_the_store() {
        let (store, query) = setup(MockStore::Failing("store is down".to_string()));

        let (status, content_type, body) = get(&query, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["version"], BUILD_VERSION);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn metrics_exposes_the_latency_histogram() {
        let (_, query) = setup(MockStore::Fixed(vec![]));
        get(&query, "/query?lat=1&lng=1").await;
        get(&query, "/query?lat=oops&lng=1").await;

        let (status, content_type, body) = get(&query, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("regiond_query_processed_delay_seconds_count 1"));
    }
}
