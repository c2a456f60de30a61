// External imports
use chrono::{Datelike, Duration, Months, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

// Internal imports
use super::frequency::{Frequency, FrequencyUnit};

/// Calendar feature encoded into `[-0.5, 0.5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFeature {
    SecondOfMinute,
    MinuteOfHour,
    HourOfDay,
    DayOfWeek,
    DayOfMonth,
    DayOfYear,
    MonthOfYear,
    WeekOfYear,
}

impl TimeFeature {
    pub fn value(&self, timestamp: &NaiveDateTime) -> f32 {
        let (position, span) = match self {
            Self::SecondOfMinute => (timestamp.second(), 59),
            Self::MinuteOfHour => (timestamp.minute(), 59),
            Self::HourOfDay => (timestamp.hour(), 23),
            Self::DayOfWeek => (timestamp.weekday().num_days_from_monday(), 6),
            Self::DayOfMonth => (timestamp.day0(), 30),
            Self::DayOfYear => (timestamp.ordinal0(), 365),
            Self::MonthOfYear => (timestamp.month0(), 11),
            Self::WeekOfYear => (timestamp.iso_week().week0(), 52),
        };
        position as f32 / span as f32 - 0.5
    }
}

/// Calendar features that carry information at the given frequency.
pub fn time_features_from_frequency(freq: &Frequency) -> Vec<TimeFeature> {
    use TimeFeature::*;

    match freq.unit {
        FrequencyUnit::Year | FrequencyUnit::Quarter => vec![],
        FrequencyUnit::Month => vec![MonthOfYear],
        FrequencyUnit::Week => vec![DayOfMonth, WeekOfYear],
        FrequencyUnit::Day | FrequencyUnit::BusinessDay => vec![DayOfWeek, DayOfMonth, DayOfYear],
        FrequencyUnit::Hour => vec![HourOfDay, DayOfWeek, DayOfMonth, DayOfYear],
        FrequencyUnit::Minute => vec![MinuteOfHour, HourOfDay, DayOfWeek, DayOfMonth, DayOfYear],
        FrequencyUnit::Second => vec![
            SecondOfMinute,
            MinuteOfHour,
            HourOfDay,
            DayOfWeek,
            DayOfMonth,
            DayOfYear,
        ],
    }
}

/// Timestamp `steps` periods after `start`.
pub fn advance(start: &NaiveDateTime, freq: &Frequency, steps: usize) -> NaiveDateTime {
    let steps = steps as u64 * freq.multiple;
    match freq.unit {
        FrequencyUnit::Month => *start + Months::new(steps as u32),
        FrequencyUnit::Quarter => *start + Months::new(3 * steps as u32),
        FrequencyUnit::Year => *start + Months::new(12 * steps as u32),
        FrequencyUnit::BusinessDay => {
            let mut current = *start;
            let mut remaining = steps;
            while remaining > 0 {
                current += Duration::days(1);
                if current.weekday().num_days_from_monday() < 5 {
                    remaining -= 1;
                }
            }
            current
        }
        unit => *start + Duration::seconds((unit.seconds().unwrap_or(1) * steps) as i64),
    }
}

/// Row-major `[length, features.len()]` matrix of feature values for
/// `length` consecutive periods starting at `start`.
pub fn time_feature_matrix(
    features: &[TimeFeature],
    start: &NaiveDateTime,
    freq: &Frequency,
    length: usize,
) -> Vec<f32> {
    let mut values = Vec::with_capacity(length * features.len());
    for step in 0..length {
        let timestamp = advance(start, freq, step);
        values.extend(features.iter().map(|feature| feature.value(&timestamp)));
    }
    values
}

/// Age of each position in a series, `log10(2 + t)`, starting at `offset`.
pub fn age_feature(offset: usize, length: usize) -> Vec<f32> {
    (offset..offset + length)
        .map(|t| (2.0 + t as f32).log10())
        .collect()
}
