//! The handful of estimators the analysis needs. Empty input yields 0.0 throughout.

/// Median, averaging the two middle values of an even-length input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Root mean square, `sqrt(mean(x^2))`.
///
/// Population erase times are reported as RMS rather than the arithmetic mean, which
/// weights the slow parts of a group more heavily.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let squares: f64 = values.iter().map(|x| x * x).sum();
    (squares / values.len() as f64).sqrt()
}

/// Sample standard deviation (n - 1 denominator); 0.0 for fewer than two values.
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_and_even_inputs() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn rms_and_stdev_of_two_trials() {
        let values = [10.0, 12.0];
        assert!((rms(&values) - 122.0f64.sqrt()).abs() < 1e-9);
        assert!((sample_stdev(&values) - 2.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn stdev_needs_two_values() {
        assert_eq!(sample_stdev(&[5.0]), 0.0);
        assert_eq!(rms(&[5.0]), 5.0);
    }
}
