//! # Series Statistics
//!
//! Small descriptive-statistics kernels over `f64` slices. Every function
//! returns `None` when the input is too short or degenerate to say
//! anything; callers treat that as "no signal".

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance.
#[must_use]
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(sum_sq / values.len() as f64)
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Standard deviation over mean. `None` for a non-positive mean.
#[must_use]
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= f64::EPSILON {
        return None;
    }
    Some(std_dev(values)? / m)
}

/// Least-squares slope against the sample index.
#[must_use]
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = mean(values)?;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den <= f64::EPSILON {
        return None;
    }
    Some(num / den)
}

/// Pearson correlation of two equally long series.
///
/// `None` if lengths differ, fewer than 3 points, or either side is flat.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 3 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    let denom = (vx * vy).sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Sample autocorrelation at `lag`.
///
/// `None` when the series is flat or shorter than `lag + 2`.
#[must_use]
pub fn autocorrelation(values: &[f64], lag: usize) -> Option<f64> {
    if lag == 0 || values.len() < lag + 2 {
        return None;
    }
    let m = mean(values)?;
    let denom: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    if denom <= f64::EPSILON {
        return None;
    }
    let num: f64 = values
        .iter()
        .zip(&values[lag..])
        .map(|(a, b)| (a - m) * (b - m))
        .sum();
    Some(num / denom)
}

/// Shannon entropy of a histogram over `[lo, hi]` with `buckets` bins,
/// normalized by `log2(buckets)` into [0, 1].
///
/// Values outside the range are clamped into the edge bins.
#[must_use]
pub fn normalized_entropy(values: &[f64], buckets: usize, lo: f64, hi: f64) -> Option<f64> {
    if values.is_empty() || buckets < 2 || hi <= lo {
        return None;
    }
    let mut counts = vec![0usize; buckets];
    let width = (hi - lo) / buckets as f64;
    for value in values {
        let idx = ((value - lo) / width).floor();
        let idx = if idx.is_finite() {
            (idx.max(0.0) as usize).min(buckets - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }
    let total = values.len() as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    Some(entropy / (buckets as f64).log2())
}

/// Clamps a value into [0, 1], mapping NaN to 0.
#[must_use]
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < 1e-9);
        assert!((variance(&values).unwrap() - 4.0).abs() < 1e-9);
        assert!((std_dev(&values).unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_slope() {
        let values = [1.0, 3.0, 5.0, 7.0];
        assert!((linear_slope(&values).unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(linear_slope(&[1.0]), None);
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&xs, &ys).unwrap() - 1.0).abs() < 1e-9);
        let flat = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(pearson(&xs, &flat), None);
    }

    #[test]
    fn test_autocorrelation_detects_period() {
        let values: Vec<f64> = (0..40).map(|i| if i % 4 < 2 { 0.9 } else { 0.1 }).collect();
        let at_period = autocorrelation(&values, 4).unwrap();
        let at_half = autocorrelation(&values, 2).unwrap();
        assert!(at_period > 0.8);
        assert!(at_half < -0.8);
        assert_eq!(autocorrelation(&[0.5; 20], 2), None);
    }

    #[test]
    fn test_entropy_bounds() {
        let constant = [0.42; 50];
        assert!(normalized_entropy(&constant, 20, 0.0, 1.0).unwrap() < 1e-9);

        let uniform: Vec<f64> = (0..20).map(|i| (f64::from(i) + 0.5) / 20.0).collect();
        let h = normalized_entropy(&uniform, 20, 0.0, 1.0).unwrap();
        assert!((h - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(1.7), 1.0);
        assert_eq!(clamp01(-0.2), 0.0);
    }
}
