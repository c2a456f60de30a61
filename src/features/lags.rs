// External imports
use std::collections::BTreeSet;

// Internal imports
use super::frequency::{Frequency, FrequencyUnit};
use crate::constants::{DEFAULT_LAG_UPPER_BOUND, NUM_DEFAULT_LAGS};

const MINUTE: u64 = 60;
const HOUR: u64 = 3_600;
const DAY: u64 = 86_400;
const WEEK: u64 = 7 * DAY;

/// A seasonal cycle: lags are placed at `k * period ± delta` for `k` in `1..=cycles`.
struct Seasonality {
    period: u64,
    cycles: u64,
    delta: i64,
}

const SECOND_CYCLE: Seasonality = Seasonality { period: MINUTE, cycles: 3, delta: 2 };
const MINUTE_CYCLE: Seasonality = Seasonality { period: HOUR, cycles: 3, delta: 2 };
const HOUR_CYCLE: Seasonality = Seasonality { period: DAY, cycles: 7, delta: 1 };
const WEEKLY_CYCLE: Seasonality = Seasonality { period: WEEK, cycles: 4, delta: 1 };
const MONTHLY_CYCLE: Seasonality = Seasonality { period: 30 * DAY, cycles: 4, delta: 1 };
const YEARLY_CYCLE: Seasonality = Seasonality { period: 52 * WEEK, cycles: 3, delta: 1 };

fn push_windows(lags: &mut Vec<i64>, seasonality: &Seasonality, step: u64) {
    for k in 1..=seasonality.cycles {
        let middle = (k * seasonality.period / step) as i64;
        lags.extend(middle - seasonality.delta..=middle + seasonality.delta);
    }
}

fn seasonal_lags(freq: &Frequency) -> Vec<i64> {
    let mut lags = Vec::new();

    match freq.unit {
        FrequencyUnit::Month | FrequencyUnit::Quarter => {
            let months = if freq.unit == FrequencyUnit::Quarter { 3 } else { 1 };
            let step = months * freq.multiple;
            push_windows(
                &mut lags,
                &Seasonality { period: 12, cycles: 3, delta: 1 },
                step,
            );
        }
        FrequencyUnit::Year | FrequencyUnit::BusinessDay => {}
        unit => {
            // Fixed-length units: every coarser seasonality applies as well
            let step = unit.seconds().unwrap_or(1) * freq.multiple;
            if unit == FrequencyUnit::Second {
                push_windows(&mut lags, &SECOND_CYCLE, step);
            }
            if matches!(unit, FrequencyUnit::Second | FrequencyUnit::Minute) {
                push_windows(&mut lags, &MINUTE_CYCLE, step);
            }
            if matches!(
                unit,
                FrequencyUnit::Second | FrequencyUnit::Minute | FrequencyUnit::Hour
            ) {
                push_windows(&mut lags, &HOUR_CYCLE, step);
            }
            if unit != FrequencyUnit::Week {
                push_windows(&mut lags, &WEEKLY_CYCLE, step);
                push_windows(&mut lags, &MONTHLY_CYCLE, step);
            }
            push_windows(&mut lags, &YEARLY_CYCLE, step);
            lags.extend([4, 8, 12].iter().map(|weeks| (weeks * WEEK / step) as i64));
        }
    }

    lags
}

/// Lag indices suitable for the given frequency.
///
/// The first `NUM_DEFAULT_LAGS` lags are always `1..=7`; seasonal lags in
/// `(7, lag_ub]` follow in ascending order without duplicates.
///
/// # Arguments
///
/// * `freq` - Sampling frequency of the series
/// * `lag_ub` - Largest lag to keep
/// * `num_lags` - Optional cap on the number of lags returned
pub fn lags_for_frequency(freq: &Frequency, lag_ub: usize, num_lags: Option<usize>) -> Vec<usize> {
    let seasonal: BTreeSet<usize> = seasonal_lags(freq)
        .into_iter()
        .filter(|lag| *lag > NUM_DEFAULT_LAGS as i64 && *lag <= lag_ub as i64)
        .map(|lag| lag as usize)
        .collect();

    let mut lags: Vec<usize> = (1..=NUM_DEFAULT_LAGS).chain(seasonal).collect();
    if let Some(limit) = num_lags {
        lags.truncate(limit);
    }
    lags
}

/// Lags for a frequency with the default upper bound and no cap.
pub fn default_lags_for_frequency(freq: &Frequency) -> Vec<usize> {
    lags_for_frequency(freq, DEFAULT_LAG_UPPER_BOUND, None)
}
