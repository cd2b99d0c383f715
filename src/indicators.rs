//! Rolling indicators shared by the signal strategies. All window functions
//! return a vector aligned to the input, with NaN for warmup positions that
//! do not yet have a full window.

pub fn simple_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if period == 0 || i + 1 < period {
            result.push(f64::NAN);
            continue;
        }
        // A window containing NaN warmup values averages to NaN, which is
        // what chained indicators rely on.
        let window = &values[i + 1 - period..=i];
        result.push(window.iter().sum::<f64>() / period as f64);
    }
    result
}

pub fn exponential_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema_values = Vec::with_capacity(values.len());
    ema_values.push(values[0]);
    for i in 1..values.len() {
        let ema = values[i] * multiplier + ema_values[i - 1] * (1.0 - multiplier);
        ema_values.push(ema);
    }
    ema_values
}

/// Rolling sample standard deviation (n - 1 denominator).
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if period < 2 || i + 1 < period {
            result.push(f64::NAN);
            continue;
        }
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / (period - 1) as f64;
        result.push(variance.sqrt());
    }
    result
}

/// Fractional change over `period` steps.
pub fn rate_of_change(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if period == 0 || i < period || values[i - period].abs() < f64::EPSILON {
            result.push(f64::NAN);
        } else {
            result.push((values[i] - values[i - period]) / values[i - period]);
        }
    }
    result
}

/// Average True Range over a rolling window. The first bar's true range is
/// its high-low span since there is no previous close.
pub fn average_true_range(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let len = highs.len().min(lows.len()).min(closes.len());
    let mut true_ranges = Vec::with_capacity(len);
    for i in 0..len {
        let tr = if i == 0 {
            highs[0] - lows[0]
        } else {
            (highs[i] - lows[i])
                .max((highs[i] - closes[i - 1]).abs())
                .max((lows[i] - closes[i - 1]).abs())
        };
        true_ranges.push(tr);
    }
    simple_moving_average(&true_ranges, period)
}
