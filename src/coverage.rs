//! Coverage Classification
//!
//! Decides whether a postcode's representative point falls inside a store's
//! coverage area. Two coverage shapes are supported:
//! - radius: great-circle distance from the store center (haversine)
//! - polygon set: point-in-polygon with holes honoured as inner rings
//!
//! Classification is a pure function of (store, postcode) and is fully
//! re-computable after data edits. `classify_all` fans out over postcodes with
//! Rayon; output order follows the postcode input order.

use geo::algorithm::contains::Contains;
use geo::{Coord, LineString, Point, Polygon};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

use crate::data::{Postcode, Store};

/// Mean spherical Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A store's coverage area
///
/// Single-colour rendering decisions for overlapping coverage are not made
/// here; membership is reported per store independently, and any external
/// tie-break follows store declaration order.
#[derive(Debug, Clone)]
pub enum Coverage {
    /// Circle of `radius_km` around `center` (lng/lat point)
    Radius { center: Point<f64>, radius_km: f64 },
    /// Explicit polygon set; holes are inner rings of their polygon
    Polygons(Vec<Polygon<f64>>),
}

impl Coverage {
    /// True if `point` lies inside this coverage area
    pub fn contains(&self, point: Point<f64>) -> bool {
        match self {
            Coverage::Radius { center, radius_km } => {
                haversine_km(*center, point) <= *radius_km
            }
            Coverage::Polygons(polygons) => {
                polygons.iter().any(|polygon| polygon.contains(&point))
            }
        }
    }
}

/// Great-circle distance between two lng/lat points in kilometres
///
/// Haversine on a spherical Earth. Flat Euclidean distance is off by visible
/// margins at country scale, so this is the only distance used for radius
/// coverage.
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat_a = a.y().to_radians();
    let lat_b = b.y().to_radians();
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lng = (b.x() - a.x()).to_radians();

    let h = libm::sin(d_lat / 2.0).powi(2)
        + libm::cos(lat_a) * libm::cos(lat_b) * libm::sin(d_lng / 2.0).powi(2);

    2.0 * EARTH_RADIUS_KM * libm::asin(libm::sqrt(h))
}

/// True if `postcode` is covered by `store`
pub fn classify(store: &Store, postcode: &Postcode) -> bool {
    store.coverage.contains(postcode.centroid)
}

/// Classify every postcode against every store
///
/// Returns one `(postcode_code, assigned_store_ids)` entry per input postcode,
/// in input order. Overlapping coverage yields multi-store sets; exclusivity
/// is not enforced.
pub fn classify_all(stores: &[Store], postcodes: &[Postcode]) -> Vec<(String, BTreeSet<String>)> {
    postcodes
        .par_iter()
        .map(|postcode| {
            // Most postcodes match only a handful of stores
            let mut matched: SmallVec<[&str; 8]> = SmallVec::new();
            for store in stores {
                if classify(store, postcode) {
                    matched.push(store.id.as_str());
                }
            }
            let assigned: BTreeSet<String> = matched.into_iter().map(String::from).collect();
            (postcode.code.clone(), assigned)
        })
        .collect()
}

/// Which dataset a malformed geometry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Store,
    Postcode,
}

/// One malformed geometry, recorded at load time and reported via diagnostics
///
/// A malformed geometry never aborts a run: the offending polygon or feature
/// is excluded from classification and the rest of the data proceeds.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryIssue {
    pub kind: GeometryKind,
    pub id: String,
    pub detail: String,
}

impl fmt::Display for GeometryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            GeometryKind::Store => "store",
            GeometryKind::Postcode => "postcode",
        };
        write!(f, "{} {}: {}", kind, self.id, self.detail)
    }
}

/// Build a polygon from raw rings (first ring outer, rest holes)
///
/// Positions are `[lng, lat, ...]`; extra ordinates are ignored. A ring with
/// fewer than 3 distinct points is malformed and the whole polygon is
/// rejected with a human-readable detail.
pub fn polygon_from_rings<P: AsRef<[f64]>>(rings: &[Vec<P>]) -> Result<Polygon<f64>, String> {
    let Some((outer, inner)) = rings.split_first() else {
        return Err("polygon has no rings".to_string());
    };

    let exterior = LineString::from(ring_coords(outer)?);
    let mut interiors = Vec::with_capacity(inner.len());
    for (i, ring) in inner.iter().enumerate() {
        let coords = ring_coords(ring).map_err(|detail| format!("inner ring {}: {}", i + 1, detail))?;
        interiors.push(LineString::from(coords));
    }

    Ok(Polygon::new(exterior, interiors))
}

fn ring_coords<P: AsRef<[f64]>>(ring: &[P]) -> Result<Vec<Coord<f64>>, String> {
    let mut coords = Vec::with_capacity(ring.len());
    for position in ring {
        let position = position.as_ref();
        if position.len() < 2 {
            return Err("position with fewer than 2 ordinates".to_string());
        }
        coords.push(Coord { x: position[0], y: position[1] });
    }

    // GeoJSON rings repeat the first point; drop the closure before counting
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords.dedup();

    if coords.len() < 3 {
        return Err(format!("ring has {} distinct points, need at least 3", coords.len()));
    }
    Ok(coords)
}
