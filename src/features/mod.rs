//! Frequency-dependent feature plumbing: lag sets and calendar features.
pub mod frequency;
pub mod lags;
pub mod time_features;

pub use frequency::{Frequency, FrequencyUnit};
pub use lags::{default_lags_for_frequency, lags_for_frequency};
pub use time_features::{
    advance, age_feature, time_feature_matrix, time_features_from_frequency, TimeFeature,
};
