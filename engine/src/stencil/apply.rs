use std::ops::Range;

use ndarray::{Array, ArrayBase, Axis, Data, Dimension, Slice, Zip};

use crate::{
    errors::{EngineError, Result},
    telemetry,
};

use super::{Stencil, StencilSet};

/// Element count above which slice updates run on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Apply `set` along `axis` of `field`, returning a new array of the same shape.
///
/// Each region of the axis (low boundary, interior, high boundary) is
/// updated with one whole-slice `out += w * shifted(field)` per stencil
/// term, broadcast across every other axis.
pub fn apply_stencil<S, D>(
    field: &ArrayBase<S, D>,
    axis: usize,
    set: &StencilSet,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let len = checked_axis_len(field, axis, set.min_len())?;
    let axis = Axis(axis);
    let p = set.center_half_width();

    let mut out = Array::zeros(field.raw_dim());
    accumulate(&mut out, field, axis, 0..p, &set.low);
    accumulate(&mut out, field, axis, p..len - p, &set.centered);
    accumulate(&mut out, field, axis, len - p..len, &set.high);

    telemetry::record_apply(field.len());
    Ok(out)
}

/// Length of `axis`, validated against the minimum a stencil needs.
pub(crate) fn checked_axis_len<S, D>(
    field: &ArrayBase<S, D>,
    axis: usize,
    required: usize,
) -> Result<usize>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let ndim = field.ndim();
    if axis >= ndim {
        return Err(EngineError::AxisOutOfRange { axis, ndim });
    }
    let len = field.len_of(Axis(axis));
    if len < required {
        return Err(EngineError::ArrayTooSmall {
            axis,
            len,
            required,
        });
    }
    Ok(len)
}

fn accumulate<S, D>(
    out: &mut Array<f64, D>,
    field: &ArrayBase<S, D>,
    axis: Axis,
    targets: Range<usize>,
    stencil: &Stencil,
) where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if targets.is_empty() {
        return;
    }
    let count = targets.len();
    let mut target = out.slice_axis_mut(axis, Slice::from(targets.clone()));
    let parallel = target.len() >= PARALLEL_THRESHOLD;
    for (offset, weight) in stencil.terms() {
        // Placement guarantees every shifted window stays in bounds.
        let start = (targets.start as isize + offset) as usize;
        let source = field.slice_axis(axis, Slice::from(start..start + count));
        if parallel {
            Zip::from(&mut target)
                .and(&source)
                .par_for_each(|t, &s| *t += weight * s);
        } else {
            target.scaled_add(weight, &source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::build_stencil_set;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2, Array3};

    #[test]
    fn constant_field_has_zero_derivative() {
        let field = Array2::from_elem((9, 4), 3.5);
        for d in 1..=3 {
            let set = build_stencil_set(0.3, d, 2).unwrap();
            let out = apply_stencil(&field, 0, &set).unwrap();
            assert_eq!(out.shape(), field.shape());
            for v in out.iter() {
                assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn cubic_second_derivative_is_exact_everywhere() {
        let h = 0.1;
        let x = Array1::from_iter((0..12).map(|i| i as f64 * h));
        let f = x.mapv(|v| v.powi(3) - 2.0 * v);
        let set = build_stencil_set(h, 2, 2).unwrap();
        let out = apply_stencil(&f, 0, &set).unwrap();
        for (xi, di) in x.iter().zip(out.iter()) {
            assert_abs_diff_eq!(*di, 6.0 * xi, epsilon = 1e-8);
        }
    }

    #[test]
    fn differentiates_along_inner_axis_only() {
        let h = 0.5;
        let field = Array2::from_shape_fn((3, 8), |(r, c)| (r as f64 + 1.0) * (c as f64 * h).powi(2));
        let set = build_stencil_set(h, 1, 2).unwrap();
        let out = apply_stencil(&field, 1, &set).unwrap();
        for ((r, c), v) in out.indexed_iter() {
            assert_abs_diff_eq!(*v, 2.0 * (r as f64 + 1.0) * c as f64 * h, epsilon = 1e-10);
        }
    }

    #[test]
    fn input_is_left_untouched() {
        let field = Array1::from_iter((0..10).map(|i| (i as f64).sin()));
        let copy = field.clone();
        let set = build_stencil_set(1.0, 1, 2).unwrap();
        let _ = apply_stencil(&field, 0, &set).unwrap();
        assert_eq!(field, copy);
    }

    #[test]
    fn too_small_only_below_minimum_length() {
        let set = build_stencil_set(1.0, 2, 2).unwrap();
        let need = set.min_len();
        let short = Array1::<f64>::zeros(need - 1);
        match apply_stencil(&short, 0, &set) {
            Err(EngineError::ArrayTooSmall { len, required, .. }) => {
                assert_eq!(len, need - 1);
                assert_eq!(required, need);
            }
            other => panic!("expected ArrayTooSmall, got {other:?}"),
        }
        assert!(apply_stencil(&Array1::<f64>::zeros(need), 0, &set).is_ok());
    }

    #[test]
    fn axis_must_exist() {
        let set = build_stencil_set(1.0, 1, 2).unwrap();
        let field = Array2::<f64>::zeros((8, 8));
        assert!(matches!(
            apply_stencil(&field, 2, &set),
            Err(EngineError::AxisOutOfRange { axis: 2, ndim: 2 })
        ));
    }

    #[test]
    fn parallel_path_matches_analytic_derivative() {
        let h = 0.01;
        let field = Array3::from_shape_fn((64, 40, 40), |(i, j, k)| {
            (i as f64 * h).sin() + j as f64 * 0.5 - k as f64
        });
        let set = build_stencil_set(h, 1, 4).unwrap();
        let out = apply_stencil(&field, 0, &set).unwrap();
        for ((i, _, _), v) in out.indexed_iter() {
            assert_abs_diff_eq!(*v, (i as f64 * h).cos(), epsilon = 1e-6);
        }
    }
}
