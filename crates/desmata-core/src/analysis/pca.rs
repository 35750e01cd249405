//! Standardized 2-component principal-component projection over the
//! complete-case subset.
//!
//! An empty or single-row complete-case subset is a reported
//! [`PcaOutcome::InsufficientData`], never an unhandled numerical fault.

use ndarray::Array2;

/// Smallest complete-case subset with a defined standardization.
pub const MIN_COMPLETE_ROWS: usize = 2;

/// Successful 2-component projection. `embedding` row r belongs to input
/// row `record_indices[r]`; `rows` and `variables` let a caller judge the
/// statistically degenerate rows < variables case for itself.
#[derive(Debug, Clone)]
pub struct PcaProjection {
    pub embedding: Array2<f64>,
    pub record_indices: Vec<usize>,
    pub rows: usize,
    pub variables: usize,
    pub explained_variance: [f64; 2],
}

/// Outcome of the reduction step: a projection, or a typed refusal carrying
/// the diagnostic counts.
#[derive(Debug, Clone)]
pub enum PcaOutcome {
    Projected(PcaProjection),
    InsufficientData { rows: usize, required: usize },
}

/// Restrict to rows with no NaN across all columns, standardize each column
/// to zero mean and unit variance over that subset, and project onto the two
/// directions of maximal variance.
pub fn principal_components(matrix: &Array2<f64>) -> PcaOutcome {
    let variables = matrix.ncols();
    assert!(variables >= 2, "projection requires at least two variables");

    let record_indices: Vec<usize> = (0..matrix.nrows())
        .filter(|&i| matrix.row(i).iter().all(|v| v.is_finite()))
        .collect();
    let rows = record_indices.len();
    if rows < MIN_COMPLETE_ROWS {
        return PcaOutcome::InsufficientData { rows, required: MIN_COMPLETE_ROWS };
    }

    // Complete-case matrix.
    let mut x = Array2::zeros((rows, variables));
    for (r, &i) in record_indices.iter().enumerate() {
        x.row_mut(r).assign(&matrix.row(i));
    }

    // Standardize. Zero-variance columns are centred and left at scale 1
    // instead of dividing by zero.
    for j in 0..variables {
        let mean = x.column(j).sum() / rows as f64;
        let var = x.column(j).iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rows as f64;
        let scale = if var > 0.0 { var.sqrt() } else { 1.0 };
        for r in 0..rows {
            x[[r, j]] = (x[[r, j]] - mean) / scale;
        }
    }

    // Sample covariance and its spectral decomposition.
    let cov = x.t().dot(&x) / (rows as f64 - 1.0);
    let (eigvals, eigvecs) = jacobi_eigen(&cov);

    // Two leading components; sign fixed so the largest-magnitude loading
    // of each component is positive (deterministic across runs).
    let mut order: Vec<usize> = (0..variables).collect();
    order.sort_by(|&a, &b| {
        eigvals[b].partial_cmp(&eigvals[a]).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut components = Array2::zeros((variables, 2));
    let mut explained_variance = [0.0; 2];
    for c in 0..2 {
        let src = order[c];
        explained_variance[c] = eigvals[src].max(0.0);
        let mut pivot = 0.0f64;
        for i in 0..variables {
            let v = eigvecs[[i, src]];
            if v.abs() > pivot.abs() {
                pivot = v;
            }
        }
        let flip = if pivot < 0.0 { -1.0 } else { 1.0 };
        for i in 0..variables {
            components[[i, c]] = flip * eigvecs[[i, src]];
        }
    }

    PcaOutcome::Projected(PcaProjection {
        embedding: x.dot(&components),
        record_indices,
        rows,
        variables,
        explained_variance,
    })
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix. Returns
/// (eigenvalues, eigenvectors-as-columns); order is unspecified, the caller
/// sorts. Dimensions here are tiny (variables × variables), so the O(k³)
/// sweeps are irrelevant next to the overlay stage.
fn jacobi_eigen(sym: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let k = sym.nrows();
    let mut a = sym.clone();
    let mut v: Array2<f64> = Array2::eye(k);

    for _sweep in 0..64 {
        let off: f64 = (0..k)
            .flat_map(|p| ((p + 1)..k).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        if off.sqrt() < 1e-12 {
            break;
        }

        for p in 0..k {
            for q in (p + 1)..k {
                let apq = a[[p, q]];
                if apq.abs() < 1e-15 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (theta * theta + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A ← Jᵀ A J, applied as column then row rotation.
                for i in 0..k {
                    let aip = a[[i, p]];
                    let aiq = a[[i, q]];
                    a[[i, p]] = c * aip - s * aiq;
                    a[[i, q]] = s * aip + c * aiq;
                }
                for i in 0..k {
                    let api = a[[p, i]];
                    let aqi = a[[q, i]];
                    a[[p, i]] = c * api - s * aqi;
                    a[[q, i]] = s * api + c * aqi;
                }
                for i in 0..k {
                    let vip = v[[i, p]];
                    let viq = v[[i, q]];
                    v[[i, p]] = c * vip - s * viq;
                    v[[i, q]] = s * vip + c * viq;
                }
            }
        }
    }

    ((0..k).map(|i| a[[i, i]]).collect(), v)
}
