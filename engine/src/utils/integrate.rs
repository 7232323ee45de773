/// Running trapezoidal antiderivative on a uniform grid, starting at zero.
pub fn cumulative_trapezoid(samples: &[f64], step: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(samples.len());
    let mut acc = 0.0;
    for (i, value) in samples.iter().enumerate() {
        if i > 0 {
            acc += 0.5 * step * (samples[i - 1] + value);
        }
        out.push(acc);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_trapezoid_starts_at_zero() {
        let ones = vec![1.0; 5];
        assert_eq!(cumulative_trapezoid(&ones, 0.5), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn integrates_a_line_exactly() {
        let h = 0.25;
        let slope: Vec<f64> = (0..9).map(|i| 2.0 * i as f64 * h).collect();
        let area = cumulative_trapezoid(&slope, h);
        for (i, a) in area.iter().enumerate() {
            let x = i as f64 * h;
            assert!((a - x * x).abs() < 1e-12);
        }
    }
}
