//! Exploratory analysis over the merged municipality table: min-max
//! normalization, pairwise correlation, and the 2-component projection.
//!
//! The numeric stages work on a plain rows × variables matrix with NaN as
//! the missing-value sentinel; record types upstream use `Option<f64>`.
pub mod correlation;
pub mod normalize;
pub mod pca;

pub use correlation::{pairwise_pearson, CorrelationMatrix};
pub use normalize::min_max_normalize;
pub use pca::{principal_components, PcaOutcome, PcaProjection, MIN_COMPLETE_ROWS};

use ndarray::Array2;

use crate::merge::AnalysisRecord;

/// Fixed ordered variable list shared by normalization, correlation, and the
/// principal-component projection.
pub const VARIABLES: [&str; 6] = [
    "desmat_prop",
    "pib_per_capita",
    "ips",
    "necessidades_basicas",
    "fundamentos_bem_estar",
    "oportunidades",
];

/// One row per record, one column per [`VARIABLES`] entry; missing values
/// become NaN sentinels.
pub fn variable_matrix(records: &[AnalysisRecord]) -> Array2<f64> {
    let mut matrix = Array2::from_elem((records.len(), VARIABLES.len()), f64::NAN);
    for (i, r) in records.iter().enumerate() {
        let values = [
            r.desmat_prop,
            r.pib_per_capita,
            r.ips,
            r.necessidades_basicas,
            r.fundamentos_bem_estar,
            r.oportunidades,
        ];
        for (j, value) in values.iter().enumerate() {
            if let Some(v) = value {
                matrix[[i, j]] = *v;
            }
        }
    }
    matrix
}
