use nalgebra::{DMatrix, DVector};

use crate::errors::{EngineError, Result};

/// Vandermonde-style moment matrix: row `k` holds `x_i^k` for every sample.
pub fn moment_matrix(points: &[f64]) -> DMatrix<f64> {
    let n = points.len();
    DMatrix::from_fn(n, n, |k, i| points[i].powi(k as i32))
}

/// Solve the square system `matrix * x = rhs` with an LU decomposition.
pub fn solve_square(matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>> {
    if !matrix.is_square() || matrix.nrows() != rhs.len() {
        return Err(EngineError::LinAlg(format!(
            "expected square system, got {}x{} with rhs of length {}",
            matrix.nrows(),
            matrix.ncols(),
            rhs.len()
        )));
    }
    let solution = matrix
        .lu()
        .solve(rhs)
        .ok_or_else(|| EngineError::LinAlg("matrix is numerically singular".into()))?;
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::LinAlg(
            "solution contains non-finite entries".into(),
        ));
    }
    Ok(solution)
}
