//! Geometry ingestion: GeoJSON loading, region filtering, validity repair,
//! and projection down to the canonical attribute schema.
//!
//! A layer that cannot be read at all surfaces a typed [`IngestError`]; the
//! orchestrator substitutes an empty layer and keeps going (every later stage
//! tolerates empty input). Within a readable layer, schema mismatches degrade
//! to no-ops: a missing `state` property disables the region filter for that
//! feature, nothing more.

use std::fmt;
use std::fs;
use std::path::Path;

use geo::BooleanOps;
use geo_types::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::crs::{reproject, Crs};

// ── Keys and records ──────────────────────────────────────────────────────────

/// IBGE municipality code: a fixed-width opaque string. Never parsed as a
/// number — leading zeros are significant and must survive every join.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalityCode(String);

impl MunicipalityCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MunicipalityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One yearly deforestation polygon, immutable once ingested.
/// `area_km` is the reported native-unit area; it is carried for diagnostics
/// only and never substitutes for equal-area measurement.
#[derive(Debug, Clone)]
pub struct DeforestationPolygon {
    pub id: String,
    pub year: i32,
    pub area_km: f64,
    pub geometry: MultiPolygon<f64>,
}

/// One municipal boundary, immutable once ingested.
#[derive(Debug, Clone)]
pub struct MunicipalityBoundary {
    pub code: MunicipalityCode,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Deforestation collection plus the CRS its coordinates are expressed in.
#[derive(Debug, Clone)]
pub struct DeforestationLayer {
    pub crs: Crs,
    pub polygons: Vec<DeforestationPolygon>,
}

impl DeforestationLayer {
    pub fn empty() -> Self {
        Self { crs: Crs::Geographic, polygons: Vec::new() }
    }
}

/// Municipal boundary collection plus its CRS.
#[derive(Debug, Clone)]
pub struct MunicipalityLayer {
    pub crs: Crs,
    pub boundaries: Vec<MunicipalityBoundary>,
}

impl MunicipalityLayer {
    pub fn empty() -> Self {
        Self { crs: Crs::Geographic, boundaries: Vec::new() }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Source-level ingestion failures. All are recoverable: the pipeline
/// substitutes an empty layer and records the error.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid GeoJSON in {path}: {source}")]
    Geometry {
        path: String,
        #[source]
        source: geojson::Error,
    },
    #[error("invalid indicator table {path}: {source}")]
    Table {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("unsupported CRS label {label:?} in {path}")]
    UnsupportedCrs { path: String, label: String },
}

// ── Validity repair ───────────────────────────────────────────────────────────

/// Zero-distance-buffer analogue: push the rings through the boolean kernel
/// as a self-union. Ring winding is rewound and self-intersections split into
/// separate lobes; area is unchanged for already-valid input.
pub fn repair(geom: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geom.union(&MultiPolygon::new(Vec::new()))
}

// ── GeoJSON plumbing ──────────────────────────────────────────────────────────

fn feature_collection(text: &str, origin: &str) -> Result<FeatureCollection, IngestError> {
    let gj: GeoJson = text.parse().map_err(|source| IngestError::Geometry {
        path: origin.to_string(),
        source,
    })?;
    FeatureCollection::try_from(gj).map_err(|source| IngestError::Geometry {
        path: origin.to_string(),
        source,
    })
}

/// Collection-level CRS from the legacy `crs` foreign member; plain GeoJSON
/// (no member) is geographic.
fn collection_crs(fm: &Option<JsonObject>, origin: &str) -> Result<Crs, IngestError> {
    let Some(crs_value) = fm.as_ref().and_then(|m| m.get("crs")) else {
        return Ok(Crs::Geographic);
    };
    let label = crs_value
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    Crs::parse(label).ok_or_else(|| IngestError::UnsupportedCrs {
        path: origin.to_string(),
        label: label.to_string(),
    })
}

fn feature_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geom = feature.geometry.as_ref()?;
    match Geometry::<f64>::try_from(geom).ok()? {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    }
}

/// First present property among `keys`, coerced to a string. Numeric values
/// are formatted, which is the best recovery available when a source has
/// already stripped a code's leading zeros.
fn prop_string(props: Option<&JsonObject>, keys: &[&str]) -> Option<String> {
    let map = props?;
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn prop_i64(props: Option<&JsonObject>, key: &str) -> Option<i64> {
    match props?.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn prop_f64(props: Option<&JsonObject>, key: &str) -> Option<f64> {
    match props?.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Deforestation layer ───────────────────────────────────────────────────────

/// Parse a deforestation FeatureCollection, keeping only features tagged with
/// `region` — a feature without the `state` property is treated as already
/// filtered and kept.
pub fn parse_deforestation(
    text: &str,
    region: &str,
    origin: &str,
) -> Result<DeforestationLayer, IngestError> {
    let fc = feature_collection(text, origin)?;
    let crs = collection_crs(&fc.foreign_members, origin)?;

    let mut polygons = Vec::new();
    for (idx, feature) in fc.features.iter().enumerate() {
        let props = feature.properties.as_ref();

        if let Some(state) = prop_string(props, &["state"]) {
            if state != region {
                continue;
            }
        }

        let Some(geometry) = feature_multipolygon(feature) else {
            continue;
        };
        let Some(year) = prop_i64(props, "year") else {
            continue;
        };
        let id = prop_string(props, &["uuid", "id_desmat", "id"])
            .unwrap_or_else(|| format!("desmat-{idx}"));
        let area_km = prop_f64(props, "area_km").unwrap_or(f64::NAN);

        polygons.push(DeforestationPolygon {
            id,
            year: year as i32,
            area_km,
            geometry: repair(&geometry),
        });
    }

    Ok(DeforestationLayer { crs, polygons })
}

pub fn load_deforestation(path: &Path, region: &str) -> Result<DeforestationLayer, IngestError> {
    let origin = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: origin.clone(),
        source,
    })?;
    parse_deforestation(&text, region, &origin)
}

// ── Municipality layer ────────────────────────────────────────────────────────

/// Parse a municipal boundary FeatureCollection down to (code, name, geometry).
/// Features without the `CD_MUN` join key cannot be attributed and are skipped.
pub fn parse_municipalities(text: &str, origin: &str) -> Result<MunicipalityLayer, IngestError> {
    let fc = feature_collection(text, origin)?;
    let crs = collection_crs(&fc.foreign_members, origin)?;

    let mut boundaries = Vec::new();
    for feature in &fc.features {
        let props = feature.properties.as_ref();
        let Some(code) = prop_string(props, &["CD_MUN"]) else {
            continue;
        };
        let Some(geometry) = feature_multipolygon(feature) else {
            continue;
        };
        let name = prop_string(props, &["NM_MUN"]).unwrap_or_default();

        boundaries.push(MunicipalityBoundary {
            code: MunicipalityCode::new(code),
            name,
            geometry: repair(&geometry),
        });
    }

    Ok(MunicipalityLayer { crs, boundaries })
}

pub fn load_municipalities(path: &Path) -> Result<MunicipalityLayer, IngestError> {
    let origin = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: origin.clone(),
        source,
    })?;
    parse_municipalities(&text, &origin)
}

// ── CRS harmonization ─────────────────────────────────────────────────────────

/// If the layers disagree, reproject the municipal boundaries into the
/// deforestation CRS — never the reverse: all downstream clipping anchors to
/// the deforestation layer's native frame.
pub fn harmonize(defor: &DeforestationLayer, mut mun: MunicipalityLayer) -> MunicipalityLayer {
    if mun.crs != defor.crs {
        for b in &mut mun.boundaries {
            b.geometry = reproject(&b.geometry, mun.crs, defor.crs);
        }
        mun.crs = defor.crs;
    }
    mun
}
