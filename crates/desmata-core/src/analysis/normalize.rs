//! Column-wise min-max rescaling to [0, 1].

use ndarray::Array2;

/// Rescale each column via `(x - min) / (max - min)`, with min/max taken
/// over the column's non-NaN values. A zero-range column is undefined for
/// every row (NaN), not a divide-by-zero fault. NaN inputs stay NaN; the
/// row count is preserved.
pub fn min_max_normalize(matrix: &Array2<f64>) -> Array2<f64> {
    let mut out = matrix.clone();
    for j in 0..matrix.ncols() {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in matrix.column(j).iter() {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        let range = hi - lo;
        for i in 0..matrix.nrows() {
            let v = matrix[[i, j]];
            out[[i, j]] = if v.is_finite() && range > 0.0 {
                (v - lo) / range
            } else {
                f64::NAN
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn columns_rescale_to_unit_interval() {
        let m = array![[10.0, 0.0], [20.0, 5.0], [30.0, 10.0]];
        let n = min_max_normalize(&m);
        assert_eq!(n[[0, 0]], 0.0);
        assert_eq!(n[[1, 0]], 0.5);
        assert_eq!(n[[2, 0]], 1.0);
        assert_eq!(n[[1, 1]], 0.5);
    }

    #[test]
    fn nan_values_are_ignored_for_bounds_and_preserved() {
        let m = array![[10.0], [f64::NAN], [30.0]];
        let n = min_max_normalize(&m);
        assert_eq!(n[[0, 0]], 0.0);
        assert!(n[[1, 0]].is_nan(), "missing input must stay missing");
        assert_eq!(n[[2, 0]], 1.0);
        assert_eq!(n.nrows(), 3, "row count must be preserved");
    }

    #[test]
    fn zero_range_column_is_undefined_everywhere() {
        let m = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let n = min_max_normalize(&m);
        for i in 0..3 {
            assert!(n[[i, 0]].is_nan(), "constant column row {i} should be NaN");
        }
        assert_eq!(n[[2, 1]], 1.0, "healthy columns are unaffected");
    }

    #[test]
    fn all_nan_column_stays_nan() {
        let m = array![[f64::NAN], [f64::NAN]];
        let n = min_max_normalize(&m);
        assert!(n[[0, 0]].is_nan() && n[[1, 0]].is_nan());
    }
}
