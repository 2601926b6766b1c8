//! # Lookup Data Model
//!
//! The values that flow between the network frontends, the query service and
//! a [`GeofenceStore`](crate::store::GeofenceStore):
//!
//! - [`Coordinate`] - a parsed latitude/longitude pair
//! - [`RegionMatch`] - one region containing a coordinate, with its attributes
//! - [`MatchPolicy`] - how a frontend turns matches into an outcome
//! - [`LookupOutcome`] - the protocol-neutral answer to a lookup

use crate::proto::Point;
use std::collections::BTreeMap;

/// Attribute name to value mapping carried by a region (e.g. `"iso" => "FR"`).
///
/// Ordered by name, so rendered JSON bodies are byte-stable.
pub type Attributes = BTreeMap<String, String>;

/// Attribute holding the ISO code reported by the RPC frontend.
pub const ISO_KEY: &str = "iso";

/// Literal reported when no region answers a lookup.
pub const UNKNOWN: &str = "unknown";

/// A point in decimal degrees. No range is enforced; any value that parsed as
/// a float is accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<Point> for Coordinate {
    fn from(point: Point) -> Self {
        Self::new(f64::from(point.latitude), f64::from(point.longitude))
    }
}

/// One candidate region returned by a store lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionMatch {
    pub attributes: Attributes,
}

impl RegionMatch {
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for RegionMatch
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Fallback policy applied to the store's matches.
///
/// The two protocols deliberately disagree: gRPC callers only get a code when
/// the first match carries [`ISO_KEY`], HTTP callers get whatever attributes
/// the first match has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPolicy {
    /// `Found` only if the first match has an `"iso"` attribute.
    IsoCode,
    /// `Found` with every attribute of the first match.
    FullAttributes,
}

/// Protocol-neutral result of a lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(Attributes),
    Unknown,
}

impl LookupOutcome {
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}
