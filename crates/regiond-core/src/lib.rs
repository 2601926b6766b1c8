#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

/// gRPC service and message definitions generated from `proto/regiond.proto`.
///
/// ## Service
///
/// - `RegionLookup.GetRegion` - resolves a [`Point`](proto::Point) to the
///   code of the region containing it.
///
/// The encoded [`FILE_DESCRIPTOR_SET`](proto::FILE_DESCRIPTOR_SET) is exported
/// so servers can register it with the reflection service.
pub mod proto {
    tonic::include_proto!("regiond");

    /// Encoded descriptor set for `regiond.proto`, used by server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("regiond_descriptor");
}
