//! Spatial overlay: attributes every unit of deforested area to the
//! municipality it falls within.
//!
//! The pairwise intersection runs in the layers' working CRS; each clipped
//! piece is then re-measured in the equal-area frame (`crs::equal_area_km2`).
//! Clipping units are never trusted for area — the working CRS is usually
//! angular.

use geo::{BooleanOps, BoundingRect, Intersects};
use geo_types::{MultiPolygon, Rect};

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::crs::{equal_area_km2, Crs};
use crate::ingest::{
    DeforestationLayer, DeforestationPolygon, MunicipalityBoundary, MunicipalityCode,
    MunicipalityLayer,
};

/// One clipped fragment of a deforestation polygon inside one municipality.
/// A source polygon yields zero pieces (outside every boundary), one, or
/// several (straddling a boundary) — each independently valid.
#[derive(Debug, Clone)]
pub struct IntersectionPiece {
    pub deforestation_id: String,
    pub year: i32,
    pub code: MunicipalityCode,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub area_km2: f64,
}

/// Intersect every deforestation polygon against every municipal boundary.
/// Layers must already be harmonized to a common CRS (`ingest::harmonize`).
///
/// Pure pairwise work with no shared state; the `threading` feature fans the
/// outer loop across a rayon pool with output order identical to the
/// sequential path.
pub fn intersect_layers(
    defor: &DeforestationLayer,
    mun: &MunicipalityLayer,
) -> Vec<IntersectionPiece> {
    debug_assert_eq!(defor.crs, mun.crs, "layers must be harmonized before overlay");

    // Bounding boxes once per municipality; the rectangle test rejects the
    // vast majority of pairs before the boolean kernel runs.
    let indexed: Vec<(Rect<f64>, &MunicipalityBoundary)> = mun
        .boundaries
        .iter()
        .filter_map(|b| b.geometry.bounding_rect().map(|r| (r, b)))
        .collect();
    let crs = defor.crs;

    #[cfg(feature = "threading")]
    {
        defor
            .polygons
            .par_iter()
            .flat_map_iter(|d| pieces_for(d, &indexed, crs))
            .collect()
    }
    #[cfg(not(feature = "threading"))]
    {
        defor
            .polygons
            .iter()
            .flat_map(|d| pieces_for(d, &indexed, crs))
            .collect()
    }
}

fn pieces_for(
    d: &DeforestationPolygon,
    municipalities: &[(Rect<f64>, &MunicipalityBoundary)],
    crs: Crs,
) -> Vec<IntersectionPiece> {
    let Some(dbox) = d.geometry.bounding_rect() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (mbox, m) in municipalities {
        if !dbox.intersects(mbox) {
            continue;
        }
        let clipped = d.geometry.intersection(&m.geometry);
        if clipped.0.is_empty() {
            continue;
        }
        let area_km2 = equal_area_km2(&clipped, crs);
        out.push(IntersectionPiece {
            deforestation_id: d.id.clone(),
            year: d.year,
            code: m.code.clone(),
            name: m.name.clone(),
            geometry: clipped,
            area_km2,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Coord, LineString, Polygon};

    fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                Coord { x: min_x, y: min_y },
                Coord { x: max_x, y: min_y },
                Coord { x: max_x, y: max_y },
                Coord { x: min_x, y: max_y },
                Coord { x: min_x, y: min_y },
            ]),
            vec![],
        )])
    }

    fn boundary(code: &str, name: &str, geom: MultiPolygon<f64>) -> MunicipalityBoundary {
        MunicipalityBoundary {
            code: MunicipalityCode::new(code),
            name: name.to_string(),
            geometry: geom,
        }
    }

    fn two_municipality_layer() -> MunicipalityLayer {
        MunicipalityLayer {
            crs: Crs::Geographic,
            boundaries: vec![
                boundary("1500101", "Oeste", square(-51.0, -3.0, -50.0, -2.0)),
                boundary("1500102", "Leste", square(-50.0, -3.0, -49.0, -2.0)),
            ],
        }
    }

    fn defor_layer(polygons: Vec<DeforestationPolygon>) -> DeforestationLayer {
        DeforestationLayer { crs: Crs::Geographic, polygons }
    }

    #[test]
    fn straddling_polygon_splits_into_equal_pieces() {
        let poly = DeforestationPolygon {
            id: "d1".into(),
            year: 2020,
            area_km: f64::NAN,
            geometry: square(-50.5, -2.8, -49.5, -2.2),
        };
        let whole = equal_area_km2(&poly.geometry, Crs::Geographic);
        let pieces = intersect_layers(&defor_layer(vec![poly]), &two_municipality_layer());

        assert_eq!(pieces.len(), 2, "boundary-straddling polygon must yield two pieces");
        let sum: f64 = pieces.iter().map(|p| p.area_km2).sum();
        let rel = (sum - whole).abs() / whole;
        assert!(
            rel < 1e-6,
            "piece areas must reassemble the source polygon: {sum:.6} vs {whole:.6} km² (rel {rel:.2e})"
        );
        // An equal-area frame makes equal lon-splits equal in km² too.
        let rel_halves = (pieces[0].area_km2 - pieces[1].area_km2).abs() / whole;
        assert!(rel_halves < 1e-3, "halves differ by {rel_halves:.2e} of the whole");
    }

    #[test]
    fn pieces_carry_source_attributes() {
        let poly = DeforestationPolygon {
            id: "d7".into(),
            year: 2019,
            area_km: 12.5,
            geometry: square(-50.9, -2.9, -50.8, -2.8),
        };
        let pieces = intersect_layers(&defor_layer(vec![poly]), &two_municipality_layer());
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].deforestation_id, "d7");
        assert_eq!(pieces[0].year, 2019);
        assert_eq!(pieces[0].code.as_str(), "1500101");
        assert_eq!(pieces[0].name, "Oeste");
    }

    #[test]
    fn polygon_outside_all_boundaries_yields_nothing() {
        let poly = DeforestationPolygon {
            id: "far".into(),
            year: 2020,
            area_km: f64::NAN,
            geometry: square(-40.0, -10.0, -39.0, -9.0),
        };
        let pieces = intersect_layers(&defor_layer(vec![poly]), &two_municipality_layer());
        assert!(pieces.is_empty(), "disjoint polygon must be silently dropped");
    }

    #[test]
    fn contained_polygon_keeps_its_full_area() {
        let geometry = square(-50.7, -2.7, -50.3, -2.3);
        let whole = equal_area_km2(&geometry, Crs::Geographic);
        let poly = DeforestationPolygon { id: "in".into(), year: 2021, area_km: f64::NAN, geometry };
        let pieces = intersect_layers(&defor_layer(vec![poly]), &two_municipality_layer());
        assert_eq!(pieces.len(), 1);
        let rel = (pieces[0].area_km2 - whole).abs() / whole;
        assert!(rel < 1e-6, "contained piece lost area: rel {rel:.2e}");
    }

    #[test]
    fn empty_layers_produce_no_pieces() {
        let pieces = intersect_layers(&defor_layer(Vec::new()), &two_municipality_layer());
        assert!(pieces.is_empty());
        let pieces = intersect_layers(
            &defor_layer(Vec::new()),
            &MunicipalityLayer { crs: Crs::Geographic, boundaries: Vec::new() },
        );
        assert!(pieces.is_empty());
    }
}
