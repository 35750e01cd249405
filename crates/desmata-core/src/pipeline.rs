//! Pipeline orchestrator: runs all stages in order.
//!
//! Stage order:
//!   1. Geometry ingestion (+ CRS harmonization)
//!   2. Spatial overlay
//!   3. Annual aggregation
//!   4. Indicator merge + deforested share
//!   5. Normalization
//!   6. Correlation and principal components
//!
//! No stage failure aborts the run: unreadable sources degrade to empty
//! layers (recorded in `load_errors`) and the analysis stages answer empty
//! input with NaN tables and an insufficient-data PCA outcome.

use std::path::PathBuf;

use ndarray::Array2;

use crate::aggregate::{aggregate, AnnualMatrix};
use crate::analysis::{
    min_max_normalize, pairwise_pearson, principal_components, variable_matrix,
    CorrelationMatrix, PcaOutcome, VARIABLES,
};
use crate::ingest::{self, DeforestationLayer, IngestError, MunicipalityLayer};
use crate::merge::{merge_indicators, AnalysisRecord, SocioeconomicRecord};
use crate::overlay::intersect_layers;

/// File inputs for one batch run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub deforestation: PathBuf,
    pub municipalities: PathBuf,
    pub indicators: PathBuf,
    /// Region tag the deforestation layer is filtered to (e.g. "PA").
    pub region: String,
}

/// Every derived table of one run. Each field is a fresh immutable value;
/// callers may stop between stages without leaving shared state behind.
#[derive(Debug)]
pub struct PipelineResult {
    pub matrix: AnnualMatrix,
    pub records: Vec<AnalysisRecord>,
    pub normalized: Array2<f64>,
    pub correlation: CorrelationMatrix,
    pub pca: PcaOutcome,
    /// Source-unreadable conditions recovered by substituting empty input.
    pub load_errors: Vec<IngestError>,
}

/// Run every stage against already-loaded inputs. Pure value transformation;
/// this is the testable core of the pipeline.
pub fn run_layers(
    defor: &DeforestationLayer,
    mun: MunicipalityLayer,
    indicators: &[SocioeconomicRecord],
) -> PipelineResult {
    let mun = ingest::harmonize(defor, mun);
    let pieces = intersect_layers(defor, &mun);
    let matrix = aggregate(&pieces);
    let records = merge_indicators(&matrix, indicators);
    let normalized = min_max_normalize(&variable_matrix(&records));
    let correlation = pairwise_pearson(&normalized, &VARIABLES);
    let pca = principal_components(&normalized);

    PipelineResult {
        matrix,
        records,
        normalized,
        correlation,
        pca,
        load_errors: Vec::new(),
    }
}

/// Load the three sources and run the full pipeline. Unreadable sources are
/// replaced with empty collections and recorded — the worst case is a run of
/// empty tables plus an insufficient-data PCA outcome, never an abort.
pub fn run(config: &PipelineConfig) -> PipelineResult {
    let mut load_errors = Vec::new();

    let defor = match ingest::load_deforestation(&config.deforestation, &config.region) {
        Ok(layer) => layer,
        Err(e) => {
            load_errors.push(e);
            DeforestationLayer::empty()
        }
    };
    let mun = match ingest::load_municipalities(&config.municipalities) {
        Ok(layer) => layer,
        Err(e) => {
            load_errors.push(e);
            MunicipalityLayer::empty()
        }
    };
    let indicators = match crate::merge::load_indicators(&config.indicators) {
        Ok(records) => records,
        Err(e) => {
            load_errors.push(e);
            Vec::new()
        }
    };

    let mut result = run_layers(&defor, mun, &indicators);
    result.load_errors = load_errors;
    result
}
