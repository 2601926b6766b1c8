//! gRPC service implementation for region lookups.
//!
//! [`RegionService`] implements the [`RegionLookup`] service generated from
//! the protobuf definition. It converts the incoming [`Point`] into a
//! [`Coordinate`], asks the shared [`QueryService`] for an ISO-code outcome
//! and renders it as a [`RegionResponse`].
//!
//! A store failure becomes an `INTERNAL` status; there are no partial
//! responses.

use crate::server::{
    metrics::{Outcome, Protocol},
    service::query::QueryService,
};
use regiond_core::{
    proto::{
        Point, RegionResponse,
        region_lookup_server::{RegionLookup, SERVICE_NAME},
    },
    types::{Coordinate, MatchPolicy},
};
use std::time::Instant;
use tonic::{Request, Response, Status};

#[derive(Clone)]
pub struct RegionService {
    query: QueryService,
}

impl RegionService {
    pub fn new(query: QueryService) -> Self {
        Self { query }
    }
}

#[tonic::async_trait]
impl RegionLookup for RegionService {
    #[tracing::instrument(
        skip_all,
        fields(lat = req.get_ref().latitude, lng = req.get_ref().longitude)
    )]
    async fn get_region(&self, req: Request<Point>) -> Result<Response<RegionResponse>, Status> {
        let start = Instant::now();
        let at = Coordinate::from(req.into_inner());
        let metrics = self.query.metrics();

        let res = match self.query.lookup(at, MatchPolicy::IsoCode).await {
            Ok((outcome, elapsed)) => {
                metrics.record_request(Protocol::Rpc, Outcome::Ok);
                let response = RegionResponse::from(outcome);
                tracing::debug!(code = %response.code, ?elapsed, "resolved region");
                Ok(Response::new(response))
            }
            Err(e) => {
                metrics.record_request(Protocol::Rpc, Outcome::StoreError);
                tracing::warn!("lookup failed: {}", e);
                Err(e.into())
            }
        };

        metrics.observe_grpc_handling(SERVICE_NAME, "GetRegion", start.elapsed());
        res
    }
}
