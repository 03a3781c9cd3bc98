//! Data Loading and Management
//!
//! Loads the two session inputs: the store configuration (JSON) and the
//! postcode dataset (GeoJSON FeatureCollection or flat centroid CSV). Both are
//! loaded once per session and read-only thereafter.
//!
//! The engine is polymorphic over the postcode representation: every postcode
//! exposes a string code and a centroid usable by the classifier, with the
//! boundary kept only when the source provides one.

use anyhow::{bail, Context, Result};
use geo::algorithm::centroid::Centroid;
use geo::{MultiPolygon, Point};
use geojson::{GeoJson, Value};
use polars::prelude::*;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::sync::Arc;

use crate::coverage::{polygon_from_rings, Coverage, GeometryIssue, GeometryKind};

/// Property keys probed, in order, for the postcode identifier of a feature
const PCODE_KEYS: &[&str] = &["pcode", "POA_CODE21", "POA_CODE", "postcode"];

const DEFAULT_STORE_COLOR: &str = "#2563eb";

/// A retail store with its coverage area
///
/// Immutable during a session; `color` is display-only and carried through
/// from configuration untouched.
#[derive(Debug, Clone)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub coverage: Coverage,
    pub color: String,
}

impl Store {
    /// Radius-coverage store with the default display color
    pub fn radius(
        id: impl Into<String>,
        name: impl Into<String>,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Self {
        Store {
            id: id.into(),
            name: name.into(),
            coverage: Coverage::Radius { center: Point::new(lng, lat), radius_km },
            color: DEFAULT_STORE_COLOR.to_string(),
        }
    }
}

/// A postcode region: string code plus representative location
#[derive(Debug, Clone)]
pub struct Postcode {
    pub code: String,
    /// Centroid as a lng/lat point
    pub centroid: Point<f64>,
    /// Boundary geometry, present when loaded from GeoJSON
    pub boundary: Option<MultiPolygon<f64>>,
}

impl Postcode {
    /// Postcode known only by its centroid (flat centroid-table sources)
    pub fn from_centroid(code: impl Into<String>, lat: f64, lng: f64) -> Self {
        Postcode { code: code.into(), centroid: Point::new(lng, lat), boundary: None }
    }
}

/// One store entry of the configuration file
///
/// Exactly one coverage shape must be given: `lat`/`lng`/`radiusKm` for radius
/// coverage, or `polygons` (GeoJSON-ordered `[lng, lat]` rings) for polygon
/// coverage.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default, rename = "radiusKm")]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub polygons: Option<Vec<Vec<Vec<[f64; 2]>>>>,
    #[serde(default = "default_store_color")]
    pub color: String,
}

fn default_store_color() -> String {
    DEFAULT_STORE_COLOR.to_string()
}

/// Load store configuration from a JSON file
pub fn load_stores(path: &str) -> Result<(Vec<Store>, Vec<GeometryIssue>)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read store config: {}", path))?;
    let configs: Vec<StoreConfig> =
        serde_json::from_str(&text).context("Failed to parse store config JSON")?;
    let (stores, issues) = stores_from_configs(configs)?;
    println!("  Stores: {} ({} geometry issues)", stores.len(), issues.len());
    Ok((stores, issues))
}

/// Build stores from parsed configuration entries
///
/// Declaration order is preserved; it is the documented tie-break order for
/// any downstream single-store choice. Invalid polygons are excluded and
/// recorded as issues; structural config problems (missing or ambiguous
/// coverage shape, duplicate ids) fail the whole load.
pub fn stores_from_configs(
    configs: Vec<StoreConfig>,
) -> Result<(Vec<Store>, Vec<GeometryIssue>)> {
    let mut stores = Vec::with_capacity(configs.len());
    let mut issues = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for config in configs {
        if !seen.insert(config.id.clone()) {
            bail!("duplicate store id: {}", config.id);
        }

        let coverage = match (config.lat, config.lng, config.radius_km, config.polygons) {
            (Some(lat), Some(lng), Some(radius_km), None) => {
                if !radius_km.is_finite() || radius_km < 0.0 {
                    bail!("store {}: radiusKm must be a non-negative number", config.id);
                }
                Coverage::Radius { center: Point::new(lng, lat), radius_km }
            }
            (None, None, None, Some(polygons)) => {
                let mut valid = Vec::with_capacity(polygons.len());
                for rings in &polygons {
                    match polygon_from_rings(rings) {
                        Ok(polygon) => valid.push(polygon),
                        Err(detail) => issues.push(GeometryIssue {
                            kind: GeometryKind::Store,
                            id: config.id.clone(),
                            detail,
                        }),
                    }
                }
                Coverage::Polygons(valid)
            }
            _ => bail!(
                "store {}: provide either lat/lng/radiusKm or polygons, not both or neither",
                config.id
            ),
        };

        stores.push(Store {
            id: config.id,
            name: config.name,
            coverage,
            color: config.color,
        });
    }

    Ok((stores, issues))
}

/// Load postcodes from GeoJSON FeatureCollection text
///
/// Each feature needs a postcode identifier under one of the known property
/// keys and Polygon/MultiPolygon geometry. Features that fail either
/// requirement are skipped and recorded as issues; the rest of the collection
/// still loads.
pub fn load_postcodes_geojson(text: &str) -> Result<(Vec<Postcode>, Vec<GeometryIssue>)> {
    let geojson: GeoJson = text.parse().context("Failed to parse postcode GeoJSON")?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        bail!("postcode dataset must be a GeoJSON FeatureCollection");
    };

    let mut postcodes = Vec::with_capacity(collection.features.len());
    let mut issues = Vec::new();

    for (index, feature) in collection.features.iter().enumerate() {
        let code = feature
            .properties
            .as_ref()
            .and_then(|props| PCODE_KEYS.iter().find_map(|key| props.get(*key)))
            .and_then(property_code);
        let Some(code) = code else {
            issues.push(postcode_issue(
                format!("feature {}", index),
                "no postcode property".to_string(),
            ));
            continue;
        };

        let Some(geometry) = feature.geometry.as_ref() else {
            issues.push(postcode_issue(code, "feature has no geometry".to_string()));
            continue;
        };

        let ring_sets: Vec<&Vec<Vec<Vec<f64>>>> = match &geometry.value {
            Value::Polygon(rings) => vec![rings],
            Value::MultiPolygon(polygons) => polygons.iter().collect(),
            _ => {
                issues.push(postcode_issue(
                    code,
                    "geometry is not Polygon or MultiPolygon".to_string(),
                ));
                continue;
            }
        };

        let mut polygons = Vec::with_capacity(ring_sets.len());
        for rings in ring_sets {
            match polygon_from_rings(rings) {
                Ok(polygon) => polygons.push(polygon),
                Err(detail) => issues.push(postcode_issue(code.clone(), detail)),
            }
        }

        let boundary = MultiPolygon::new(polygons);
        let Some(centroid) = boundary.centroid() else {
            issues.push(postcode_issue(code, "degenerate geometry, no centroid".to_string()));
            continue;
        };

        postcodes.push(Postcode { code, centroid, boundary: Some(boundary) });
    }

    Ok((postcodes, issues))
}

fn postcode_issue(id: String, detail: String) -> GeometryIssue {
    GeometryIssue { kind: GeometryKind::Postcode, id, detail }
}

fn property_code(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Load postcodes from a flat `postcode,lat,lng` centroid CSV
///
/// The `postcode` column is forced to string so codes like "0800" keep their
/// leading zeros.
pub fn load_postcode_centroids(path: &str) -> Result<Vec<Postcode>> {
    let schema = Schema::from_iter([Field::new("postcode".into(), DataType::String)]);
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(schema)))
        .try_into_reader_with_file_path(Some(path.into()))
        .with_context(|| format!("Failed to create CSV reader: {}", path))?
        .finish()
        .with_context(|| format!("Failed to load centroid CSV: {}", path))?;

    let postcodes = postcodes_from_centroid_frame(&frame)?;
    println!("  Postcodes: {}", postcodes.len());
    Ok(postcodes)
}

fn postcodes_from_centroid_frame(frame: &DataFrame) -> Result<Vec<Postcode>> {
    let codes = frame
        .column("postcode")
        .context("centroid CSV missing 'postcode' column")?
        .as_materialized_series()
        .str()
        .context("'postcode' column is not a string column")?;
    let lat = frame
        .column("lat")
        .context("centroid CSV missing 'lat' column")?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let lat = lat.f64()?;
    let lng = frame
        .column("lng")
        .context("centroid CSV missing 'lng' column")?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let lng = lng.f64()?;

    let mut postcodes = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        let (Some(code), Some(lat), Some(lng)) = (codes.get(row), lat.get(row), lng.get(row))
        else {
            bail!("centroid CSV row {} has missing values", row + 1);
        };
        postcodes.push(Postcode::from_centroid(code, lat, lng));
    }
    Ok(postcodes)
}

/// Demo postcode polygons: Sydney CBD (2000), Melbourne CBD (3000) and
/// Brunswick (3057). Production runs load a full postcode boundary
/// FeatureCollection with the same property shape.
pub const SAMPLE_POSTCODES_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "pcode": "2000" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[
          [151.19, -33.88], [151.23, -33.88], [151.23, -33.855],
          [151.19, -33.855], [151.19, -33.88]
        ]]
      }
    },
    {
      "type": "Feature",
      "properties": { "pcode": "3000" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[
          [144.94, -37.825], [144.98, -37.825], [144.98, -37.805],
          [144.94, -37.805], [144.94, -37.825]
        ]]
      }
    },
    {
      "type": "Feature",
      "properties": { "pcode": "3057" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[
          [144.95, -37.78], [144.98, -37.78], [144.98, -37.76],
          [144.95, -37.76], [144.95, -37.78]
        ]]
      }
    }
  ]
}"#;

/// Demo stores matching the sample postcode set
pub fn sample_stores() -> Vec<Store> {
    vec![
        Store {
            id: "SYD".to_string(),
            name: "Sydney CBD".to_string(),
            coverage: Coverage::Radius {
                center: Point::new(151.2093, -33.8688),
                radius_km: 5.0,
            },
            color: "#2563eb".to_string(),
        },
        Store {
            id: "MEL".to_string(),
            name: "Melbourne CBD".to_string(),
            coverage: Coverage::Radius {
                center: Point::new(144.9631, -37.8136),
                radius_km: 10.0,
            },
            color: "#16a34a".to_string(),
        },
    ]
}
