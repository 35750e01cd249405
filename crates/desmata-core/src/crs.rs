//! Coordinate reference systems and the fixed equal-area measurement frame.
//! All coordinate math uses f64.
//!
//! Clipping runs in whatever CRS the deforestation layer ships in (usually
//! geographic degrees, which are not area-preserving); area is always
//! measured after projecting into the Albers frame below. The clip-in-working
//! / measure-in-equal-area split is load-bearing and must not be collapsed.

use geo::{Area, MapCoords, MultiPolygon};
use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Authalic sphere radius (metres) — preserves total ellipsoid surface area.
const EARTH_RADIUS_M: f64 = 6_371_007.181;

/// Albers equal-area conic parameters for Brazil:
/// standard parallels -2° / -22°, origin (-12°, -54°).
const LAT_1_DEG: f64 = -2.0;
const LAT_2_DEG: f64 = -22.0;
const LAT_0_DEG: f64 = -12.0;
const LON_0_DEG: f64 = -54.0;

/// Coordinate reference system of a geometry layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    /// Geographic coordinates in degrees. SIRGAS 2000 (EPSG:4674) and
    /// WGS 84 (EPSG:4326) are coincident at this pipeline's tolerance.
    Geographic,
    /// The fixed equal-area measurement frame (metres).
    BrazilAlbers,
}

impl Crs {
    /// Parse an authority label as found in source metadata.
    /// Returns None for anything this pipeline cannot interpret.
    pub fn parse(label: &str) -> Option<Crs> {
        let tail = label.rsplit(':').next().unwrap_or(label).trim();
        match tail.to_ascii_uppercase().as_str() {
            "4326" | "4674" | "CRS84" => Some(Crs::Geographic),
            _ => None,
        }
    }
}

// ── Albers forward / inverse ──────────────────────────────────────────────────

/// Projection constants (n, C, rho0) per Snyder's formulation.
/// n is negative for southern-hemisphere standard parallels.
fn albers_constants() -> (f64, f64, f64) {
    let phi1 = LAT_1_DEG.to_radians();
    let phi2 = LAT_2_DEG.to_radians();
    let phi0 = LAT_0_DEG.to_radians();
    let n = (phi1.sin() + phi2.sin()) / 2.0;
    let c = phi1.cos().powi(2) + 2.0 * n * phi1.sin();
    let rho0 = EARTH_RADIUS_M * (c - 2.0 * n * phi0.sin()).sqrt() / n;
    (n, c, rho0)
}

/// Geographic degrees → equal-area metres.
pub fn to_equal_area(p: Coord<f64>) -> Coord<f64> {
    let (n, c, rho0) = albers_constants();
    let lat = p.y.to_radians();
    let lon = p.x.to_radians();
    let rho = EARTH_RADIUS_M * (c - 2.0 * n * lat.sin()).sqrt() / n;
    let theta = n * (lon - LON_0_DEG.to_radians());
    Coord {
        x: rho * theta.sin(),
        y: rho0 - rho * theta.cos(),
    }
}

/// Equal-area metres → geographic degrees.
pub fn from_equal_area(p: Coord<f64>) -> Coord<f64> {
    let (n, c, rho0) = albers_constants();
    let sign = n.signum();
    let rho = sign * (p.x * p.x + (rho0 - p.y) * (rho0 - p.y)).sqrt();
    let theta = (sign * p.x).atan2(sign * (rho0 - p.y));
    let lat = ((c - (rho * n / EARTH_RADIUS_M).powi(2)) / (2.0 * n)).asin();
    let lon = LON_0_DEG.to_radians() + theta / n;
    Coord {
        x: lon.to_degrees(),
        y: lat.to_degrees(),
    }
}

// ── Layer-level operations ────────────────────────────────────────────────────

/// Transform a geometry between the supported reference systems.
pub fn reproject(geom: &MultiPolygon<f64>, from: Crs, to: Crs) -> MultiPolygon<f64> {
    match (from, to) {
        (Crs::Geographic, Crs::Geographic) | (Crs::BrazilAlbers, Crs::BrazilAlbers) => {
            geom.clone()
        }
        (Crs::Geographic, Crs::BrazilAlbers) => geom.map_coords(to_equal_area),
        (Crs::BrazilAlbers, Crs::Geographic) => geom.map_coords(from_equal_area),
    }
}

/// True ground area in km², measured in the equal-area frame regardless of
/// the CRS the geometry is currently expressed in.
pub fn equal_area_km2(geom: &MultiPolygon<f64>, crs: Crs) -> f64 {
    match crs {
        Crs::BrazilAlbers => geom.unsigned_area() / 1.0e6,
        Crs::Geographic => geom.map_coords(to_equal_area).unsigned_area() / 1.0e6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{LineString, Polygon};

    /// Axis-aligned geographic box with `steps` vertices per edge, so that
    /// projected edges track the curved parallels closely.
    fn dense_box(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64, steps: usize) -> MultiPolygon<f64> {
        let mut ring = Vec::with_capacity(4 * steps + 1);
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(Coord { x: min_lon + t * (max_lon - min_lon), y: min_lat });
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(Coord { x: max_lon, y: min_lat + t * (max_lat - min_lat) });
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(Coord { x: max_lon - t * (max_lon - min_lon), y: max_lat });
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push(Coord { x: min_lon, y: max_lat - t * (max_lat - min_lat) });
        }
        ring.push(ring[0]);
        MultiPolygon::new(vec![Polygon::new(LineString::from(ring), vec![])])
    }

    /// Closed-form spherical area of a lon/lat box, in km².
    fn spherical_box_km2(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> f64 {
        let dl = (max_lon - min_lon).to_radians();
        let band = max_lat.to_radians().sin() - min_lat.to_radians().sin();
        EARTH_RADIUS_M * EARTH_RADIUS_M * dl * band / 1.0e6
    }

    #[test]
    fn roundtrip_within_tolerance() {
        // Grid over the Amazon / Brazil extent.
        for lat10 in -30..6 {
            for lon10 in -74..-34 {
                let p = Coord { x: lon10 as f64, y: lat10 as f64 };
                let back = from_equal_area(to_equal_area(p));
                assert!(
                    (back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9,
                    "roundtrip drift at ({}, {}): got ({}, {})",
                    p.x, p.y, back.x, back.y
                );
            }
        }
    }

    #[test]
    fn projected_area_matches_spherical_closed_form() {
        // 1°×1° cell near the equator and another at -20° latitude; a dense
        // boundary keeps chord-vs-arc error below the assertion tolerance.
        for &(lon, lat) in &[(-52.0, -1.0), (-50.0, -21.0)] {
            let mp = dense_box(lon, lat, lon + 1.0, lat + 1.0, 64);
            let projected = equal_area_km2(&mp, Crs::Geographic);
            let exact = spherical_box_km2(lon, lat, lon + 1.0, lat + 1.0);
            assert_relative_eq!(projected, exact, max_relative = 1e-5);
        }
    }

    #[test]
    fn reproject_identity_is_noop() {
        let mp = dense_box(-52.0, -3.0, -51.0, -2.0, 4);
        let same = reproject(&mp, Crs::Geographic, Crs::Geographic);
        assert_eq!(mp, same);
    }

    #[test]
    fn reproject_there_and_back_preserves_coords() {
        let mp = dense_box(-52.0, -3.0, -51.0, -2.0, 8);
        let back = reproject(&reproject(&mp, Crs::Geographic, Crs::BrazilAlbers), Crs::BrazilAlbers, Crs::Geographic);
        for (a, b) in mp.0[0].exterior().coords().zip(back.0[0].exterior().coords()) {
            assert!((a.x - b.x).abs() < 1e-8 && (a.y - b.y).abs() < 1e-8);
        }
    }

    #[test]
    fn parse_known_authority_labels() {
        assert_eq!(Crs::parse("EPSG:4326"), Some(Crs::Geographic));
        assert_eq!(Crs::parse("EPSG:4674"), Some(Crs::Geographic));
        assert_eq!(Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(Crs::Geographic));
        assert_eq!(Crs::parse("EPSG:3857"), None);
    }
}
