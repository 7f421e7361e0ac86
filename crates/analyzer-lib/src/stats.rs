//! Scalar statistics over metric series
//!
//! Small numeric helpers shared by the fragmentation engine and the
//! report reductions. All functions are total: short or empty slices
//! yield 0 rather than an error.

/// Arithmetic mean, 0.0 for an empty slice (NaN cells are skipped)
pub fn mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.iter().copied().filter(|v| !v.is_nan()) {
        sum += v;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    sum / n as f64
}

/// Sample standard deviation (Bessel's correction), 0.0 below 2 samples
pub fn sample_std(values: &[f64]) -> f64 {
    let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.len() < 2 {
        return 0.0;
    }
    let m = mean(&clean);
    let var = clean.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (clean.len() - 1) as f64;
    var.sqrt()
}

/// Population standard deviation, 0.0 for an empty slice
pub fn population_std(values: &[f64]) -> f64 {
    let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.is_empty() {
        return 0.0;
    }
    let m = mean(&clean);
    let var = clean.iter().map(|v| (v - m).powi(2)).sum::<f64>() / clean.len() as f64;
    var.sqrt()
}

/// Coefficient of variation that never divides by zero
///
/// Returns `std / mean`, defined as 0 whenever the mean is not
/// strictly positive.
pub fn safe_cv(std: f64, mean: f64) -> f64 {
    if mean > 0.0 {
        std / mean
    } else {
        0.0
    }
}

/// Maximum of a slice, 0.0 when empty (NaN cells are skipped)
pub fn max(values: &[f64]) -> f64 {
    let m = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);
    if m.is_finite() {
        m
    } else {
        0.0
    }
}

/// Minimum of a slice, 0.0 when empty (NaN cells are skipped)
pub fn min(values: &[f64]) -> f64 {
    let m = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::INFINITY, f64::min);
    if m.is_finite() {
        m
    } else {
        0.0
    }
}

/// Trapezoidal-rule integral of `y` over `x`
///
/// Used as the area-under-curve measure for fragmentation and queue
/// series. Slices must be the same length; fewer than 2 points
/// integrate to 0.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(y.len(), x.len());
    if y.len() < 2 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 1..y.len() {
        area += (x[i] - x[i - 1]) * (y[i] + y[i - 1]) / 2.0;
    }
    area
}
