//! Aggregation of intersection pieces into the municipality × year matrix.
//!
//! The year set is data-dependent, so rows carry a year→area mapping rather
//! than fixed fields, and the observed years travel alongside as an explicit
//! sorted set — no stage ever infers "the year list" from output columns.

use std::collections::{BTreeMap, BTreeSet};

use crate::ingest::MunicipalityCode;
use crate::overlay::IntersectionPiece;

/// One municipality's yearly series. `by_year` holds every observed year;
/// a year with no detected deforestation is an explicit 0.0, not an absence.
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityRow {
    pub code: MunicipalityCode,
    pub name: String,
    pub by_year: BTreeMap<i32, f64>,
    /// Row-wise sum of `by_year` — the standing invariant, recomputed on
    /// every extension.
    pub total_km2: f64,
}

/// Wide municipality-by-year aggregate, rows sorted by municipality code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnualMatrix {
    pub years: BTreeSet<i32>,
    pub rows: Vec<MunicipalityRow>,
}

/// Group pieces by (code, name, year) and sum areas. The reduction is a pure
/// associative sum over BTree-ordered keys, so output is deterministic and
/// partition-order tolerant.
pub fn aggregate(pieces: &[IntersectionPiece]) -> AnnualMatrix {
    let mut matrix = AnnualMatrix::default();
    matrix.extend(pieces);
    matrix
}

impl AnnualMatrix {
    /// Fold additional pieces in. A later year of source data only ever adds
    /// a column (zero-filled for rows that lack it) and updates totals;
    /// existing per-year values for other years are untouched.
    pub fn extend(&mut self, pieces: &[IntersectionPiece]) {
        let mut grouped: BTreeMap<MunicipalityCode, (String, BTreeMap<i32, f64>)> = self
            .rows
            .drain(..)
            .map(|r| (r.code, (r.name, r.by_year)))
            .collect();

        for p in pieces {
            self.years.insert(p.year);
            let (_, by_year) = grouped
                .entry(p.code.clone())
                .or_insert_with(|| (p.name.clone(), BTreeMap::new()));
            *by_year.entry(p.year).or_insert(0.0) += p.area_km2;
        }

        // Zero-fill the full year set and recompute totals, re-establishing
        // the row-sum invariant.
        self.rows = grouped
            .into_iter()
            .map(|(code, (name, mut by_year))| {
                for &year in &self.years {
                    by_year.entry(year).or_insert(0.0);
                }
                let total_km2 = by_year.values().sum();
                MunicipalityRow { code, name, by_year, total_km2 }
            })
            .collect();
    }

    /// Area for a (municipality, year) key; keys not present imply zero.
    pub fn area(&self, code: &MunicipalityCode, year: i32) -> f64 {
        self.rows
            .iter()
            .find(|r| &r.code == code)
            .and_then(|r| r.by_year.get(&year).copied())
            .unwrap_or(0.0)
    }

    /// Per-year totals across all municipalities, in year order — the input
    /// series for the (out-of-scope) time-series visualization.
    pub fn year_totals(&self) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .map(|&year| {
                let total = self
                    .rows
                    .iter()
                    .map(|r| r.by_year.get(&year).copied().unwrap_or(0.0))
                    .sum();
                (year, total)
            })
            .collect()
    }
}
