use approx::assert_abs_diff_eq;
use engine::{
    apply_stencil, build_stencil_set, errors::EngineError, solve_integer,
    stencil::Region, utils::cumulative_trapezoid,
};
use ndarray::{Array1, Array3, Axis};

fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// `d`-th derivative of `sum_k c[k] x^k` at `x`.
fn poly_derivative(c: &[f64], d: usize, x: f64) -> f64 {
    c.iter()
        .enumerate()
        .skip(d)
        .map(|(k, ck)| ck * factorial(k) / factorial(k - d) * x.powi((k - d) as i32))
        .sum()
}

#[test]
fn weights_reproduce_monomial_derivatives() {
    let offset_sets: [&[i64]; 4] = [&[-1, 0, 1], &[0, 1, 2, 3], &[-4, -3, -2, -1, 0], &[-3, -1, 0, 2, 4, 5]];
    for offsets in offset_sets {
        for d in 0..offsets.len() {
            let c = solve_integer(offsets, d).unwrap();
            for k in 0..offsets.len() {
                let got = c.apply_to(|x| x.powi(k as i32));
                let want = if k == d { factorial(k) } else { 0.0 };
                assert_abs_diff_eq!(got, want, epsilon = 1e-7);
            }
        }
    }
}

#[test]
fn textbook_coefficients() {
    let c = solve_integer(&[-1, 0, 1], 1).unwrap();
    for (w, e) in c.weights.iter().zip([-0.5, 0.0, 0.5]) {
        assert_abs_diff_eq!(*w, e, epsilon = 1e-14);
    }
    let c = solve_integer(&[-2, -1, 0, 1, 2], 2).unwrap();
    for (w, e) in c.weights.iter().zip([-1.0 / 12.0, 4.0 / 3.0, -2.5, 4.0 / 3.0, -1.0 / 12.0]) {
        assert_abs_diff_eq!(*w, e, epsilon = 1e-12);
    }
}

#[test]
fn centered_weights_follow_derivative_parity() {
    for acc in 1..=6 {
        for d in 1..=4 {
            let set = build_stencil_set(1.0, d, acc).unwrap();
            let w = &set.centered.coefficients;
            let n = w.len();
            for i in 0..n {
                let sign = if d % 2 == 0 { 1.0 } else { -1.0 };
                assert_abs_diff_eq!(w[i], sign * w[n - 1 - i], epsilon = 1e-8);
            }
        }
    }
}

#[test]
fn constant_fields_differentiate_to_zero_on_every_axis() {
    let field = Array3::from_elem((9, 11, 13), -2.25);
    for d in 1..=3 {
        let set = build_stencil_set(0.2, d, 2).unwrap();
        for axis in 0..3 {
            let out = apply_stencil(&field, axis, &set).unwrap();
            assert_eq!(out.shape(), field.shape());
            for v in out.iter() {
                assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-8);
            }
        }
    }
}

#[test]
fn polynomials_are_exact_at_interior_and_boundary_points() {
    let h = 0.1;
    for d in 1..=3 {
        for acc in 1..=4 {
            let set = build_stencil_set(h, d, acc).unwrap();
            let degree = acc + d - 1;
            let c: Vec<f64> = (0..=degree).map(|k| 1.0 / (k as f64 + 1.0)).collect();
            for len in [set.min_len(), set.min_len() + 5] {
                let x = Array1::from_iter((0..len).map(|i| i as f64 * h));
                let f = x.mapv(|xi| poly_derivative(&c, 0, xi));
                let out = apply_stencil(&f, 0, &set).unwrap();
                for (xi, got) in x.iter().zip(out.iter()) {
                    assert_abs_diff_eq!(*got, poly_derivative(&c, d, *xi), epsilon = 1e-6);
                }
            }
        }
    }
}

#[test]
fn derivative_then_antiderivative_recovers_field() {
    let n = 401;
    let h = std::f64::consts::TAU / (n - 1) as f64;
    let f = Array1::from_iter((0..n).map(|i| (i as f64 * h).sin() + 0.5));
    let set = build_stencil_set(h, 1, 4).unwrap();
    let df = apply_stencil(&f, 0, &set).unwrap();
    let recovered = cumulative_trapezoid(df.as_slice().unwrap(), h);
    let shift = f[0] - recovered[0];
    for (orig, rec) in f.iter().zip(&recovered) {
        assert_abs_diff_eq!(*orig, rec + shift, epsilon = 1e-4);
    }
}

#[test]
fn boundary_placement_is_a_sliding_window() {
    let set = build_stencil_set(1.0, 2, 4).unwrap();
    let len = 20;
    let p = set.center_half_width();
    for i in 0..p {
        let here = set.placement(i, len).unwrap();
        assert_eq!(here.region, Region::Low);
        assert_eq!(here.start, i);
        assert_eq!(here.stencil, &set.low);
        let next = set.placement(i + 1, len).unwrap();
        if next.region == Region::Low {
            assert_eq!(next.start, here.start + 1);
            assert_eq!(next.stencil.coefficients, here.stencil.coefficients);
        }
    }
    for i in len - p..len {
        let here = set.placement(i, len).unwrap();
        assert_eq!(here.region, Region::High);
        assert_eq!(here.start + set.high_half_width(), i);
    }
    assert_eq!(set.placement(p, len).unwrap().region, Region::Interior);
}

#[test]
fn array_too_small_threshold_is_exact() {
    for (d, acc) in [(1, 2), (2, 2), (1, 4), (3, 1)] {
        let set = build_stencil_set(1.0, d, acc).unwrap();
        let need = set.low_half_width() + set.high_half_width() + 1;
        assert_eq!(set.min_len(), need);
        let short = Array3::<f64>::zeros((4, need - 1, 2));
        assert!(matches!(
            apply_stencil(&short, 1, &set),
            Err(EngineError::ArrayTooSmall { axis: 1, .. })
        ));
        let exact = Array3::<f64>::zeros((4, need, 2));
        let out = apply_stencil(&exact, 1, &set).unwrap();
        assert_eq!(out.len_of(Axis(1)), need);
    }
}
