//! Finite-difference weights for an arbitrary set of sample offsets.
//!
//! The weights `w_i` for offsets `x_i` solve the moment system
//! `sum_i w_i x_i^k = k! * [k == d]` for `k = 0..n`, which makes the
//! stencil exact for every polynomial of degree below `n`.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{EngineError, Result},
    utils::linalg::{moment_matrix, solve_square},
};

/// Weights paired with the offsets they apply to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub offsets: Vec<f64>,
    pub weights: Vec<f64>,
    pub derivative_order: usize,
    /// Guaranteed accuracy order, `offsets.len() - 1 - derivative_order`.
    pub accuracy: usize,
}

impl Coefficients {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Evaluate the weighted sum against a function sampled at the offsets.
    pub fn apply_to<F>(&self, f: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        self.offsets
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * f(*x))
            .sum()
    }
}

/// Solve for the weights approximating the `derivative_order`-th derivative
/// at offset zero from samples at `offsets`.
pub fn solve(offsets: &[f64], derivative_order: usize) -> Result<Coefficients> {
    validate_offsets(offsets, derivative_order)?;

    // Normalise to [-1, 1] so the moment matrix stays well conditioned.
    let scale = offsets.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let scaled: Vec<f64> = offsets.iter().map(|x| x / scale).collect();

    let n = offsets.len();
    let mut rhs = DVector::zeros(n);
    rhs[derivative_order] = factorial(derivative_order) / scale.powi(derivative_order as i32);

    let weights = solve_square(moment_matrix(&scaled), &rhs)?;
    tracing::trace!(target: "engine", n, derivative_order, "solved stencil coefficients");

    Ok(Coefficients {
        offsets: offsets.to_vec(),
        weights: weights.iter().copied().collect(),
        derivative_order,
        accuracy: n - 1 - derivative_order,
    })
}

/// Grid-index flavour of [`solve`].
pub fn solve_integer(offsets: &[i64], derivative_order: usize) -> Result<Coefficients> {
    let offsets: Vec<f64> = offsets.iter().map(|&o| o as f64).collect();
    solve(&offsets, derivative_order)
}

fn validate_offsets(offsets: &[f64], derivative_order: usize) -> Result<()> {
    if offsets.len() <= derivative_order {
        return Err(EngineError::invalid_stencil(format!(
            "derivative order {derivative_order} needs at least {} offsets, got {}",
            derivative_order + 1,
            offsets.len()
        )));
    }
    if let Some(bad) = offsets.iter().find(|x| !x.is_finite()) {
        return Err(EngineError::invalid_stencil(format!(
            "offset {bad} is not finite"
        )));
    }
    for (i, a) in offsets.iter().enumerate() {
        if offsets[i + 1..].contains(a) {
            return Err(EngineError::invalid_stencil(format!(
                "duplicate offset {a} in {offsets:?}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn three_point_first_derivative() {
        let c = solve_integer(&[-1, 0, 1], 1).unwrap();
        assert_abs_diff_eq!(c.weights[0], -0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(c.weights[1], 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(c.weights[2], 0.5, epsilon = 1e-14);
        assert_eq!(c.accuracy, 1);
    }

    #[test]
    fn five_point_second_derivative() {
        let c = solve_integer(&[-2, -1, 0, 1, 2], 2).unwrap();
        let expected = [-1.0 / 12.0, 4.0 / 3.0, -2.5, 4.0 / 3.0, -1.0 / 12.0];
        for (w, e) in c.weights.iter().zip(expected) {
            assert_abs_diff_eq!(*w, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn forward_first_derivative() {
        let c = solve_integer(&[0, 1, 2], 1).unwrap();
        let expected = [-1.5, 2.0, -0.5];
        for (w, e) in c.weights.iter().zip(expected) {
            assert_abs_diff_eq!(*w, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn reproduces_monomial_derivatives() {
        let offsets = [-3.0, -1.0, 0.0, 2.0, 5.0];
        for d in 0..offsets.len() {
            let c = solve(&offsets, d).unwrap();
            for k in 0..offsets.len() {
                let got = c.apply_to(|x| x.powi(k as i32));
                let want = if k == d { factorial(k) } else { 0.0 };
                assert_abs_diff_eq!(got, want, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn real_valued_offsets_scale_like_spacing() {
        let unit = solve(&[-1.0, 0.0, 1.0], 2).unwrap();
        let fine = solve(&[-0.01, 0.0, 0.01], 2).unwrap();
        for (u, f) in unit.weights.iter().zip(&fine.weights) {
            assert_abs_diff_eq!(*f, u / 1e-4, epsilon = 1e-6);
        }
    }

    #[test]
    fn rejects_too_few_offsets() {
        let err = solve_integer(&[0, 1], 2).unwrap_err();
        assert!(matches!(err, EngineError::InvalidStencil(_)));
    }

    #[test]
    fn rejects_duplicates_and_non_finite() {
        assert!(matches!(
            solve_integer(&[-1, 0, 0, 1], 1),
            Err(EngineError::InvalidStencil(_))
        ));
        assert!(matches!(
            solve(&[0.0, f64::NAN, 1.0], 1),
            Err(EngineError::InvalidStencil(_))
        ));
    }
}
