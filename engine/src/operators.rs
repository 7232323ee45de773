//! Vector-calculus operators composed from single-axis derivatives.

use ndarray::{stack, ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension, RemoveAxis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{EngineError, Result},
    stencil::{apply_nonuniform, apply_stencil, NonUniformStencils, StencilBuilder},
};

pub const DEFAULT_ACCURACY: usize = 2;

/// Number of spatial axes an operator works over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialDimension {
    One,
    Two,
    Three,
    N(usize),
}

impl SpatialDimension {
    pub fn from_ndim(ndim: usize) -> Self {
        match ndim {
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            n => Self::N(n),
        }
    }

    pub fn ndim(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::N(n) => n,
        }
    }
}

/// Grid description: a step per axis, or explicit coordinates per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Spacing {
    Uniform(Vec<f64>),
    Coordinates(Vec<Vec<f64>>),
}

impl Spacing {
    pub fn ndim(&self) -> usize {
        match self {
            Self::Uniform(h) => h.len(),
            Self::Coordinates(c) => c.len(),
        }
    }

    pub fn dimension(&self) -> SpatialDimension {
        SpatialDimension::from_ndim(self.ndim())
    }

    fn validated(self) -> Result<Self> {
        if self.ndim() == 0 {
            return Err(EngineError::invalid_stencil(
                "spacing must describe at least one axis",
            ));
        }
        Ok(self)
    }
}

/// `d^order / dx_axis^order` at a given accuracy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDerivative {
    pub axis: usize,
    pub order: usize,
    pub accuracy: usize,
}

impl PartialDerivative {
    pub fn new(axis: usize, order: usize) -> Self {
        Self {
            axis,
            order,
            accuracy: DEFAULT_ACCURACY,
        }
    }

    pub fn with_accuracy(mut self, accuracy: usize) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn apply<S, D>(
        &self,
        builder: &StencilBuilder,
        spacing: &Spacing,
        field: &ArrayBase<S, D>,
    ) -> Result<ndarray::Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension + RemoveAxis,
    {
        let out_of_range = || EngineError::AxisOutOfRange {
            axis: self.axis,
            ndim: spacing.ndim(),
        };
        match spacing {
            Spacing::Uniform(steps) => {
                let h = *steps.get(self.axis).ok_or_else(out_of_range)?;
                let set = builder.build(h, self.order, self.accuracy)?;
                apply_stencil(field, self.axis, &set)
            }
            Spacing::Coordinates(coords) => {
                let axis_coords = coords.get(self.axis).ok_or_else(out_of_range)?;
                let stencils = NonUniformStencils::new(axis_coords, self.order, self.accuracy)?;
                apply_nonuniform(field, self.axis, &stencils)
            }
        }
    }
}

fn expect_ndim(operator: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(EngineError::DimensionMismatch {
            operator,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Check a vector field laid out as `[components, axis_0, .., axis_n-1]`.
fn expect_vector_field(operator: &'static str, n: usize, field: &ArrayViewD<'_, f64>) -> Result<()> {
    expect_ndim(operator, n + 1, field.ndim())?;
    expect_ndim(operator, n, field.len_of(Axis(0)))
}

/// Per-axis derivatives of the same order, evaluated in parallel.
fn axis_derivatives(
    builder: &StencilBuilder,
    spacing: &Spacing,
    accuracy: usize,
    order: usize,
    field: &ArrayViewD<'_, f64>,
) -> Result<Vec<ArrayD<f64>>> {
    (0..spacing.ndim())
        .into_par_iter()
        .map(|axis| {
            PartialDerivative::new(axis, order)
                .with_accuracy(accuracy)
                .apply(builder, spacing, field)
        })
        .collect()
}

/// Gradient of a scalar field; the result gains a leading component axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    spacing: Spacing,
    accuracy: usize,
}

impl Gradient {
    pub fn new(spacing: Spacing) -> Result<Self> {
        Ok(Self {
            spacing: spacing.validated()?,
            accuracy: DEFAULT_ACCURACY,
        })
    }

    pub fn with_accuracy(mut self, accuracy: usize) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn dimension(&self) -> SpatialDimension {
        self.spacing.dimension()
    }

    pub fn apply<S, D>(&self, builder: &StencilBuilder, field: &ArrayBase<S, D>) -> Result<ArrayD<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let field = field.view().into_dyn();
        expect_ndim("gradient", self.dimension().ndim(), field.ndim())?;
        let parts = axis_derivatives(builder, &self.spacing, self.accuracy, 1, &field)?;
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        Ok(stack(Axis(0), &views)?)
    }
}

/// Divergence of a vector field `[N, ...]`, returning a scalar field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    spacing: Spacing,
    accuracy: usize,
}

impl Divergence {
    pub fn new(spacing: Spacing) -> Result<Self> {
        Ok(Self {
            spacing: spacing.validated()?,
            accuracy: DEFAULT_ACCURACY,
        })
    }

    pub fn with_accuracy(mut self, accuracy: usize) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn dimension(&self) -> SpatialDimension {
        self.spacing.dimension()
    }

    pub fn apply<S, D>(&self, builder: &StencilBuilder, field: &ArrayBase<S, D>) -> Result<ArrayD<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let field = field.view().into_dyn();
        let n = self.dimension().ndim();
        expect_vector_field("divergence", n, &field)?;
        let parts: Vec<ArrayD<f64>> = (0..n)
            .into_par_iter()
            .map(|k| {
                PartialDerivative::new(k, 1)
                    .with_accuracy(self.accuracy)
                    .apply(builder, &self.spacing, &field.index_axis(Axis(0), k))
            })
            .collect::<Result<_>>()?;
        let mut total = ArrayD::zeros(&field.shape()[1..]);
        for part in &parts {
            total += part;
        }
        Ok(total)
    }
}

/// Sum of unmixed second derivatives over every axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laplacian {
    spacing: Spacing,
    accuracy: usize,
}

impl Laplacian {
    pub fn new(spacing: Spacing) -> Result<Self> {
        Ok(Self {
            spacing: spacing.validated()?,
            accuracy: DEFAULT_ACCURACY,
        })
    }

    pub fn with_accuracy(mut self, accuracy: usize) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn dimension(&self) -> SpatialDimension {
        self.spacing.dimension()
    }

    pub fn apply<S, D>(&self, builder: &StencilBuilder, field: &ArrayBase<S, D>) -> Result<ArrayD<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let field = field.view().into_dyn();
        expect_ndim("laplacian", self.dimension().ndim(), field.ndim())?;
        let parts = axis_derivatives(builder, &self.spacing, self.accuracy, 2, &field)?;
        let mut total = ArrayD::zeros(field.raw_dim());
        for part in &parts {
            total += part;
        }
        Ok(total)
    }
}

/// Curl of a three-dimensional vector field `[3, nx, ny, nz]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curl {
    spacing: Spacing,
    accuracy: usize,
}

impl Curl {
    pub fn new(spacing: Spacing) -> Result<Self> {
        let spacing = spacing.validated()?;
        match spacing.dimension() {
            SpatialDimension::Three => Ok(Self {
                spacing,
                accuracy: DEFAULT_ACCURACY,
            }),
            other => Err(EngineError::DimensionMismatch {
                operator: "curl",
                expected: 3,
                actual: other.ndim(),
            }),
        }
    }

    pub fn with_accuracy(mut self, accuracy: usize) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn apply<S, D>(&self, builder: &StencilBuilder, field: &ArrayBase<S, D>) -> Result<ArrayD<f64>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let field = field.view().into_dyn();
        expect_vector_field("curl", 3, &field)?;
        let d = |axis: usize, component: usize| {
            PartialDerivative::new(axis, 1)
                .with_accuracy(self.accuracy)
                .apply(builder, &self.spacing, &field.index_axis(Axis(0), component))
        };
        let x = d(1, 2)? - d(2, 1)?;
        let y = d(2, 0)? - d(0, 2)?;
        let z = d(0, 1)? - d(1, 0)?;
        Ok(stack(Axis(0), &[x.view(), y.view(), z.view()])?)
    }
}
