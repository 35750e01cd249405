//! Pairwise-complete Pearson correlation matrix.

use ndarray::Array2;

/// Square, symmetric correlation matrix over a fixed variable list.
/// Undefined entries (constant variable, fewer than two complete pairs)
/// are NaN rather than fabricated values.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub variables: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[[a, b]]
    }
}

/// Pearson r for every variable pair, each pair using only the rows where
/// both variables are non-NaN (pairwise-complete, not listwise). Diagonal
/// entries are exactly 1.0 unless the variable is constant across its
/// contributing rows.
pub fn pairwise_pearson(matrix: &Array2<f64>, variables: &[&str]) -> CorrelationMatrix {
    let k = matrix.ncols();
    debug_assert_eq!(k, variables.len());

    let mut values = Array2::from_elem((k, k), f64::NAN);
    for a in 0..k {
        for b in a..k {
            let r = pair_r(matrix, a, b);
            values[[a, b]] = r;
            values[[b, a]] = r;
        }
    }

    CorrelationMatrix {
        variables: variables.iter().map(|v| v.to_string()).collect(),
        values,
    }
}

fn pair_r(matrix: &Array2<f64>, a: usize, b: usize) -> f64 {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..matrix.nrows() {
        let x = matrix[[i, a]];
        let y = matrix[[i, b]];
        if x.is_finite() && y.is_finite() {
            xs.push(x);
            ys.push(y);
        }
    }
    if xs.len() < 2 {
        return f64::NAN;
    }

    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let dx = xs.iter().map(|&x| (x - mx).powi(2)).sum::<f64>().sqrt();
    let dy = ys.iter().map(|&y| (y - my).powi(2)).sum::<f64>().sqrt();
    if dx < 1e-12 || dy < 1e-12 {
        return f64::NAN;
    }
    if a == b {
        return 1.0;
    }

    let num: f64 = xs.iter().zip(ys.iter()).map(|(&x, &y)| (x - mx) * (y - my)).sum();
    (num / (dx * dy)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const VARS: [&str; 3] = ["x", "y", "z"];

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let m = array![
            [0.0, 1.0, 0.3],
            [0.5, 0.8, 0.9],
            [1.0, 0.1, 0.2],
            [0.25, 0.4, 0.7],
        ];
        let corr = pairwise_pearson(&m, &VARS);
        for a in 0..3 {
            assert_eq!(corr.get(a, a), 1.0, "diagonal [{a},{a}]");
            for b in 0..3 {
                assert_eq!(corr.get(a, b), corr.get(b, a), "asymmetry at [{a},{b}]");
                if a != b {
                    let v = corr.get(a, b);
                    assert!((-1.0..=1.0).contains(&v), "off-diagonal out of range: {v}");
                }
            }
        }
    }

    #[test]
    fn perfectly_linear_pairs_hit_plus_minus_one() {
        let m = array![[0.0, 0.0, 1.0], [0.5, 1.0, 0.5], [1.0, 2.0, 0.0]];
        let corr = pairwise_pearson(&m, &VARS);
        assert!((corr.get(0, 1) - 1.0).abs() < 1e-12);
        assert!((corr.get(0, 2) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_variable_is_undefined_not_faulted() {
        let m = array![[1.0, 0.2, 0.5], [1.0, 0.4, 0.25], [1.0, 0.9, 0.0]];
        let corr = pairwise_pearson(&m, &VARS);
        assert!(corr.get(0, 0).is_nan(), "constant diagonal must be NaN");
        assert!(corr.get(0, 1).is_nan() && corr.get(1, 0).is_nan());
        assert!((corr.get(1, 2) + 1.0).abs() < 1e-12, "healthy pair unaffected");
    }

    #[test]
    fn pairwise_complete_uses_rows_other_pairs_cannot() {
        // Column z is missing everywhere except two rows; the (x, y) pair
        // still correlates over all four rows.
        let m = array![
            [0.0, 0.0, f64::NAN],
            [0.25, 0.5, 0.1],
            [0.5, 1.0, f64::NAN],
            [1.0, 2.0, 0.9],
        ];
        let corr = pairwise_pearson(&m, &VARS);
        assert!((corr.get(0, 1) - 1.0).abs() < 1e-12);
        // (x, z) has exactly the two complete rows: r of two points is ±1.
        assert!((corr.get(0, 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fewer_than_two_complete_pairs_is_undefined() {
        let m = array![[0.1, f64::NAN, 0.5], [0.9, f64::NAN, 0.1], [0.4, 0.2, f64::NAN]];
        let corr = pairwise_pearson(&m, &VARS);
        assert!(corr.get(0, 1).is_nan(), "one shared row cannot correlate");
        assert!(corr.get(1, 2).is_nan(), "zero shared rows cannot correlate");
    }

    #[test]
    fn empty_input_is_all_nan() {
        let m = Array2::<f64>::zeros((0, 3));
        let corr = pairwise_pearson(&m, &VARS);
        for a in 0..3 {
            for b in 0..3 {
                assert!(corr.get(a, b).is_nan());
            }
        }
    }
}
