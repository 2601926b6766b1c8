//! In-memory geofence store loaded from a GeoJSON file.
//!
//! The file is a `FeatureCollection` whose features have `Polygon` or
//! `MultiPolygon` geometries. Each feature becomes one region; its
//! `properties` become the match attributes (strings verbatim, other scalars
//! as their JSON text, nulls dropped).
//!
//! Lookups scan every region whose bounding box contains the point and run an
//! even-odd ray cast against its rings. A point matches a polygon when it lies
//! inside the exterior ring and outside every hole. Matches are returned in
//! file order.
//!
//! An optional bounded cache remembers which regions answered recently queried
//! points; entries are evicted first-in, first-out.

use parking_lot::Mutex;
use regiond_core::{
    Error, Result,
    store::GeofenceStore,
    types::{Attributes, Coordinate, RegionMatch},
};
use serde::Deserialize;
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    path::Path,
};

/// Options forwarded from the process configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreOptions {
    /// Number of points kept in the lookup cache, 0 disables caching.
    pub cached_entries: usize,
    /// Log every query at debug level.
    pub debug: bool,
}

pub struct FileStore {
    regions: Vec<Region>,
    cache: Option<Mutex<PointCache>>,
    debug: bool,
}

impl FileStore {
    /// Reads and indexes the GeoJSON file at `path`.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| Error::StoreOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let regions = parse_regions(&raw).map_err(|reason| Error::StoreOpen {
            path: path.display().to_string(),
            reason,
        })?;

        tracing::info!(
            path = %path.display(),
            regions = regions.len(),
            cached_entries = options.cached_entries,
            "opened geofence store"
        );

        Ok(Self::with_regions(regions, options))
    }

    /// Indexes an in-memory GeoJSON document.
    pub fn from_geojson(raw: &[u8], options: StoreOptions) -> Result<Self> {
        let regions = parse_regions(raw).map_err(|reason| Error::StoreOpen {
            path: "<memory>".to_string(),
            reason,
        })?;
        Ok(Self::with_regions(regions, options))
    }

    fn with_regions(regions: Vec<Region>, options: StoreOptions) -> Self {
        let cache = (options.cached_entries > 0)
            .then(|| Mutex::new(PointCache::new(options.cached_entries)));
        Self {
            regions,
            cache,
            debug: options.debug,
        }
    }

    fn locate(&self, at: Coordinate) -> Vec<usize> {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, region)| region.contains(at.lng, at.lat))
            .map(|(index, _)| index)
            .collect()
    }

    fn cached_locate(&self, at: Coordinate) -> Vec<usize> {
        let Some(cache) = &self.cache else {
            return self.locate(at);
        };

        let key = (at.lat.to_bits(), at.lng.to_bits());
        if let Some(hit) = cache.lock().get(&key) {
            return hit;
        }

        // Computed outside the lock so concurrent misses don't serialize.
        let indices = self.locate(at);
        cache.lock().insert(key, indices.clone());
        indices
    }
}

impl GeofenceStore for FileStore {
    fn query(&self, at: Coordinate) -> Result<Vec<RegionMatch>> {
        let matches: Vec<RegionMatch> = self
            .cached_locate(at)
            .into_iter()
            .map(|index| RegionMatch::new(self.regions[index].attributes.clone()))
            .collect();

        if self.debug {
            tracing::debug!(lat = at.lat, lng = at.lng, matches = matches.len(), "store query");
        }

        Ok(matches)
    }
}

type CacheKey = (u64, u64);

struct PointCache {
    capacity: usize,
    entries: HashMap<CacheKey, Vec<usize>>,
    order: VecDeque<CacheKey>,
}

impl PointCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Vec<usize>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: CacheKey, indices: Vec<usize>) {
        if self.entries.contains_key(&key) {
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key);
        self.entries.insert(key, indices);
    }
}

/// `(lng, lat)` pairs, GeoJSON axis order.
type Ring = Vec<(f64, f64)>;

struct Polygon {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    fn contains(&self, x: f64, y: f64) -> bool {
        ring_contains(&self.exterior, x, y) && !self.holes.iter().any(|h| ring_contains(h, x, y))
    }
}

#[derive(Clone, Copy, Debug)]
struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BoundingBox {
    const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    fn extend(&mut self, (x, y): (f64, f64)) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

struct Region {
    attributes: Attributes,
    polygons: Vec<Polygon>,
    bbox: BoundingBox,
}

impl Region {
    fn contains(&self, x: f64, y: f64) -> bool {
        self.bbox.contains(x, y) && self.polygons.iter().any(|p| p.contains(x, y))
    }
}

/// Even-odd rule; points exactly on an edge may fall either way.
fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
    geometry: Geometry,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
}

fn parse_regions(raw: &[u8]) -> core::result::Result<Vec<Region>, String> {
    let collection: FeatureCollection =
        serde_json::from_slice(raw).map_err(|e| format!("invalid GeoJSON: {e}"))?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            build_region(feature).map_err(|reason| format!("feature {index}: {reason}"))
        })
        .collect()
}

fn build_region(feature: Feature) -> core::result::Result<Region, String> {
    let polygons = match feature.geometry {
        Geometry::Polygon { coordinates } => vec![build_polygon(coordinates)?],
        Geometry::MultiPolygon { coordinates } => coordinates
            .into_iter()
            .map(build_polygon)
            .collect::<core::result::Result<_, _>>()?,
    };

    let mut bbox = BoundingBox::EMPTY;
    for point in polygons.iter().flat_map(|p| p.exterior.iter()) {
        bbox.extend(*point);
    }

    let attributes = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect();

    Ok(Region {
        attributes,
        polygons,
        bbox,
    })
}

fn build_polygon(rings: Vec<Vec<Vec<f64>>>) -> core::result::Result<Polygon, String> {
    let mut rings = rings.into_iter().map(build_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| "polygon has no rings".to_string())??;
    let holes = rings.collect::<core::result::Result<_, _>>()?;
    Ok(Polygon { exterior, holes })
}

fn build_ring(positions: Vec<Vec<f64>>) -> core::result::Result<Ring, String> {
    if positions.len() < 3 {
        return Err(format!(
            "ring needs at least 3 positions, got {}",
            positions.len()
        ));
    }
    positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(format!(
                "position needs at least 2 numbers, got {}",
                position.len()
            )),
        })
        .collect()
}
