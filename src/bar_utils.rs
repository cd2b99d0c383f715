use crate::models::Bar;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Groups bars (by reference) keyed by symbol, restricted to a known set,
/// each group sorted by date.
pub fn group_bars_for_symbols<'a>(
    symbols: &[String],
    bars: &'a [Bar],
) -> HashMap<String, Vec<&'a Bar>> {
    let mut grouped: HashMap<String, Vec<&Bar>> = symbols
        .iter()
        .map(|symbol| (symbol.clone(), Vec::new()))
        .collect();

    for bar in bars {
        if let Some(bucket) = grouped.get_mut(&bar.symbol) {
            bucket.push(bar);
        }
    }

    grouped.retain(|_, values| !values.is_empty());
    for values in grouped.values_mut() {
        values.sort_by(|a, b| a.date.cmp(&b.date));
    }

    grouped
}

/// All distinct bar dates in chronological order.
pub fn unique_dates(bars: &[Bar]) -> Vec<DateTime<Utc>> {
    let dates: BTreeSet<DateTime<Utc>> = bars.iter().map(|bar| bar.date).collect();
    dates.into_iter().collect()
}

/// Close prices indexed by day, then by symbol.
pub fn closes_by_day(bars: &[Bar]) -> BTreeMap<DateTime<Utc>, HashMap<String, f64>> {
    let mut table: BTreeMap<DateTime<Utc>, HashMap<String, f64>> = BTreeMap::new();
    for bar in bars {
        table
            .entry(bar.date)
            .or_default()
            .insert(bar.symbol.clone(), bar.close);
    }
    table
}

/// Day-over-day fractional changes of a value series; one element shorter
/// than the input. Non-positive previous values yield 0.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|window| {
            if window[0] > 0.0 {
                window[1] / window[0] - 1.0
            } else {
                0.0
            }
        })
        .collect()
}
