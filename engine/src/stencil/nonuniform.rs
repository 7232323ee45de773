//! Per-point stencils for axes with arbitrary (monotone) coordinates.

use ndarray::{Array, ArrayBase, Axis, Data, Dimension, RemoveAxis};
use serde::{Deserialize, Serialize};

use crate::{
    coefficients,
    errors::{EngineError, Result},
    telemetry,
};

use super::apply::checked_axis_len;

/// Weights for one grid point, applied to `field[start..start + weights.len()]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStencil {
    pub start: usize,
    pub weights: Vec<f64>,
}

/// Stencils solved on actual coordinate differences, one per grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonUniformStencils {
    coords: Vec<f64>,
    derivative_order: usize,
    accuracy_order: usize,
    points: Vec<PointStencil>,
}

impl NonUniformStencils {
    /// Solve stencils for every point of `coords`.
    ///
    /// Index windows match the uniform case: `[i-p, i+p]` in the interior,
    /// `[i, i+m]` and `[i-m, i]` near the low and high ends.
    pub fn new(coords: &[f64], derivative_order: usize, accuracy_order: usize) -> Result<Self> {
        if accuracy_order < 1 {
            return Err(EngineError::invalid_stencil(format!(
                "accuracy order must be at least 1, got {accuracy_order}"
            )));
        }
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(EngineError::invalid_stencil("coordinates must be finite"));
        }
        if let Some(pair) = coords.windows(2).find(|w| w[1] <= w[0]) {
            return Err(EngineError::invalid_stencil(format!(
                "coordinates must be strictly increasing, found {} followed by {}",
                pair[0], pair[1]
            )));
        }

        let p = (accuracy_order + derivative_order + 1) / 2;
        let m = accuracy_order + derivative_order;
        let len = coords.len();
        let required = 2 * m + 1;
        if len < required {
            return Err(EngineError::invalid_stencil(format!(
                "derivative order {derivative_order} at accuracy {accuracy_order} needs at least {required} coordinates, got {len}"
            )));
        }

        let mut points = Vec::with_capacity(len);
        for i in 0..len {
            let (start, end) = if i < p {
                (i, i + m)
            } else if i + p >= len {
                (i - m, i)
            } else {
                (i - p, i + p)
            };
            let offsets: Vec<f64> = coords[start..=end].iter().map(|c| c - coords[i]).collect();
            let solved = coefficients::solve(&offsets, derivative_order)?;
            points.push(PointStencil {
                start,
                weights: solved.weights,
            });
        }
        tracing::debug!(
            target: "engine",
            points = len,
            derivative_order,
            accuracy_order,
            "built non-uniform stencils"
        );

        Ok(Self {
            coords: coords.to_vec(),
            derivative_order,
            accuracy_order,
            points,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn derivative_order(&self) -> usize {
        self.derivative_order
    }

    pub fn accuracy_order(&self) -> usize {
        self.accuracy_order
    }

    pub fn point(&self, i: usize) -> Option<&PointStencil> {
        self.points.get(i)
    }
}

/// Apply per-point stencils along `axis`; the axis length must equal the
/// number of coordinates the stencils were built for.
pub fn apply_nonuniform<S, D>(
    field: &ArrayBase<S, D>,
    axis: usize,
    stencils: &NonUniformStencils,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension + RemoveAxis,
{
    let len = checked_axis_len(field, axis, 0)?;
    if len != stencils.len() {
        return Err(EngineError::DimensionMismatch {
            operator: "non-uniform derivative",
            expected: stencils.len(),
            actual: len,
        });
    }
    let axis = Axis(axis);
    let mut out = Array::zeros(field.raw_dim());
    for (i, point) in stencils.points.iter().enumerate() {
        let mut target = out.index_axis_mut(axis, i);
        for (j, weight) in point.weights.iter().enumerate() {
            target.scaled_add(*weight, &field.index_axis(axis, point.start + j));
        }
    }
    telemetry::record_apply(field.len());
    Ok(out)
}
