//! Socioeconomic indicator integration: CSV ingestion, the left outer join
//! against the annual matrix, and the deforested-area share.
//!
//! The join key is the municipality code as an opaque string on both sides;
//! the indicator table is read with a string-typed code column so codes like
//! "0150475" keep their leading zero.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::aggregate::AnnualMatrix;
use crate::ingest::{IngestError, MunicipalityCode};

/// One row of the IPS Brasil indicator table. Header names follow the
/// published table; every numeric field is nullable.
#[derive(Debug, Clone, Deserialize)]
pub struct SocioeconomicRecord {
    #[serde(rename = "Código IBGE")]
    pub code: MunicipalityCode,
    #[serde(rename = "Área (km²)")]
    pub municipality_area_km2: Option<f64>,
    #[serde(rename = "PIB per capita 2021")]
    pub pib_per_capita: Option<f64>,
    #[serde(rename = "Índice de Progresso Social")]
    pub ips: Option<f64>,
    #[serde(rename = "Necessidades Humanas Básicas")]
    pub necessidades_basicas: Option<f64>,
    #[serde(rename = "Fundamentos do Bem-estar")]
    pub fundamentos_bem_estar: Option<f64>,
    #[serde(rename = "Oportunidades")]
    pub oportunidades: Option<f64>,
}

/// Annual matrix row joined with its indicator record. Indicator fields are
/// None on a join miss — the row itself is never dropped, the deforestation
/// signal is the primary subject.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub code: MunicipalityCode,
    pub name: String,
    pub by_year: BTreeMap<i32, f64>,
    pub total_km2: f64,
    pub municipality_area_km2: Option<f64>,
    pub pib_per_capita: Option<f64>,
    pub ips: Option<f64>,
    pub necessidades_basicas: Option<f64>,
    pub fundamentos_bem_estar: Option<f64>,
    pub oportunidades: Option<f64>,
    pub desmat_prop: Option<f64>,
}

pub fn parse_indicators(text: &str, origin: &str) -> Result<Vec<SocioeconomicRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let mut records = Vec::new();
    for record in reader.deserialize() {
        let record: SocioeconomicRecord = record.map_err(|source| IngestError::Table {
            path: origin.to_string(),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_indicators(path: &Path) -> Result<Vec<SocioeconomicRecord>, IngestError> {
    let origin = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: origin.clone(),
        source,
    })?;
    parse_indicators(&text, &origin)
}

/// `desmat_prop = total_km2 / municipality_area_km2`. Undefined (None) when
/// the denominator is missing or not strictly positive — never a fault,
/// never ±inf, never coerced to zero.
pub fn deforested_share(total_km2: f64, municipality_area_km2: Option<f64>) -> Option<f64> {
    match municipality_area_km2 {
        Some(area) if area > 0.0 => Some(total_km2 / area),
        _ => None,
    }
}

/// Left outer join of the annual matrix against the indicator table on
/// municipality code, plus the derived share column.
pub fn merge_indicators(
    matrix: &AnnualMatrix,
    indicators: &[SocioeconomicRecord],
) -> Vec<AnalysisRecord> {
    let by_code: HashMap<&str, &SocioeconomicRecord> = indicators
        .iter()
        .map(|r| (r.code.as_str(), r))
        .collect();

    matrix
        .rows
        .iter()
        .map(|row| {
            let hit = by_code.get(row.code.as_str()).copied();
            let municipality_area_km2 = hit.and_then(|r| r.municipality_area_km2);
            AnalysisRecord {
                code: row.code.clone(),
                name: row.name.clone(),
                by_year: row.by_year.clone(),
                total_km2: row.total_km2,
                municipality_area_km2,
                pib_per_capita: hit.and_then(|r| r.pib_per_capita),
                ips: hit.and_then(|r| r.ips),
                necessidades_basicas: hit.and_then(|r| r.necessidades_basicas),
                fundamentos_bem_estar: hit.and_then(|r| r.fundamentos_bem_estar),
                oportunidades: hit.and_then(|r| r.oportunidades),
                desmat_prop: deforested_share(row.total_km2, municipality_area_km2),
            }
        })
        .collect()
}
