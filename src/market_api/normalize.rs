use super::types::NormalizationMethod;

/// Rescale a raw price series so that days at different price levels compare.
/// Returns an empty vec when there are fewer than two points.
pub fn normalize(series: &[f64], method: NormalizationMethod) -> Vec<f64> {
    if series.len() < 2 {
        return Vec::new();
    }

    match method {
        NormalizationMethod::RelativeMagnitude => relative_magnitude(series),
        NormalizationMethod::PureShape => pure_shape(series),
    }
}

// A zero first value yields non-finite output; the matcher scores those as infinitely far.
fn relative_magnitude(series: &[f64]) -> Vec<f64> {
    let first = series[0];
    series.iter().map(|&x| x / first).collect()
}

fn pure_shape(series: &[f64]) -> Vec<f64> {
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![0.0; series.len()];
    }
    let span = max - min;
    series.iter().map(|&x| (x - min) / span).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_relative_magnitude() {
        let out = normalize(&[100.0, 102.0, 101.0, 105.0], NormalizationMethod::RelativeMagnitude);
        assert_close(&out, &[1.0, 1.02, 1.01, 1.05]);
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn test_pure_shape_bounds() {
        let out = normalize(&[8010.0, 8000.0, 8040.0, 8020.0], NormalizationMethod::PureShape);
        assert_close(&out, &[0.25, 0.0, 1.0, 0.5]);
        let min = out.iter().copied().fold(f64::INFINITY, f64::min);
        let max = out.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn test_pure_shape_flat_series() {
        let out = normalize(&[50.0, 50.0, 50.0], NormalizationMethod::PureShape);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_insufficient_input() {
        assert!(normalize(&[], NormalizationMethod::PureShape).is_empty());
        assert!(normalize(&[1.0], NormalizationMethod::RelativeMagnitude).is_empty());
    }

    #[test]
    fn test_zero_baseline_is_non_finite() {
        let out = normalize(&[0.0, 1.0, 2.0], NormalizationMethod::RelativeMagnitude);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| !v.is_finite()));
    }
}
