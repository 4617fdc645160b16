//! Simple moving average and trailing-window means.

/// Rolling mean over `period` values. First valid value at index period-1;
/// any NaN inside a window makes that window NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }

    result
}

/// Mean of `values[index - window .. index]`, i.e. the `window` values strictly
/// before `index`. `None` when there are fewer than `window` prior values, the
/// window is empty, or any value in it is NaN.
pub fn trailing_mean(values: &[f64], index: usize, window: usize) -> Option<f64> {
    if window == 0 || index < window || index > values.len() {
        return None;
    }
    mean(&values[index - window..index])
}

/// Arithmetic mean of a slice; `None` for empty input or any NaN.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
