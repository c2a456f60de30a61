// External imports
use serde::{Deserialize, Serialize};

// Internal imports
use crate::constants::{
    DEFAULT_DROPOUT_RATE, DEFAULT_HIDDEN_SIZE, DEFAULT_NUM_LAYERS, DEFAULT_NUM_PARALLEL_SAMPLES,
};
use crate::error::{ModuleError, Result};
use crate::features::{default_lags_for_frequency, time_features_from_frequency, Frequency};
use crate::nn::feature_embedder::default_embedding_dimension;

/// Configuration of an autoregressive lagged-RNN model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepArConfig {
    pub freq: String,
    pub context_length: usize,
    pub prediction_length: usize,
    pub num_feat_dynamic_real: usize,
    pub num_feat_static_real: usize,
    pub num_feat_static_cat: usize,
    pub cardinality: Vec<usize>,
    pub embedding_dimension: Option<Vec<usize>>,
    pub num_layers: usize,
    pub hidden_size: usize,
    pub dropout_rate: f64,
    pub lags_seq: Option<Vec<usize>>,
    pub scaling: bool,
    pub num_parallel_samples: usize,
}

/// Sizes derived from a validated [`DeepArConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RnnLayout {
    pub context_length: usize,
    pub prediction_length: usize,
    /// Lags shifted by one, so that lag 0 is the current input value.
    pub lags_seq: Vec<usize>,
    /// History needed to build every lag over the context window.
    pub past_length: usize,
    /// Age feature, user-provided dynamic reals and calendar features.
    pub num_time_feat: usize,
    pub num_feat_static_real: usize,
    pub num_feat_static_cat: usize,
    pub cardinality: Vec<usize>,
    pub embedding_dimension: Vec<usize>,
    pub num_static_feat: usize,
    pub rnn_input_size: usize,
}

impl DeepArConfig {
    /// Create a configuration with default network sizes and no covariates
    ///
    /// # Arguments
    ///
    /// * `freq` - Sampling frequency string such as `1H`
    /// * `context_length` - Number of steps the RNN is unrolled over
    /// * `prediction_length` - Number of steps to forecast
    pub fn new(freq: &str, context_length: usize, prediction_length: usize) -> Self {
        Self {
            freq: freq.to_string(),
            context_length,
            prediction_length,
            num_feat_dynamic_real: 0,
            num_feat_static_real: 0,
            num_feat_static_cat: 0,
            cardinality: Vec::new(),
            embedding_dimension: None,
            num_layers: DEFAULT_NUM_LAYERS,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            dropout_rate: DEFAULT_DROPOUT_RATE,
            lags_seq: None,
            scaling: true,
            num_parallel_samples: DEFAULT_NUM_PARALLEL_SAMPLES,
        }
    }

    pub fn with_num_feat_dynamic_real(mut self, num: usize) -> Self {
        self.num_feat_dynamic_real = num;
        self
    }

    pub fn with_num_feat_static_real(mut self, num: usize) -> Self {
        self.num_feat_static_real = num;
        self
    }

    pub fn with_num_feat_static_cat(mut self, num: usize) -> Self {
        self.num_feat_static_cat = num;
        self
    }

    pub fn with_cardinality(mut self, cardinality: Vec<usize>) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_embedding_dimension(mut self, dimension: Vec<usize>) -> Self {
        self.embedding_dimension = Some(dimension);
        self
    }

    pub fn with_num_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_dropout_rate(mut self, dropout_rate: f64) -> Self {
        self.dropout_rate = dropout_rate;
        self
    }

    pub fn with_lags_seq(mut self, lags_seq: Vec<usize>) -> Self {
        self.lags_seq = Some(lags_seq);
        self
    }

    pub fn with_scaling(mut self, scaling: bool) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_num_parallel_samples(mut self, num: usize) -> Self {
        self.num_parallel_samples = num;
        self
    }

    fn invalid(message: impl Into<String>) -> ModuleError {
        ModuleError::InvalidConfig(message.into())
    }

    /// Validate the configuration and derive tensor sizes from it.
    pub fn layout(&self) -> Result<RnnLayout> {
        let freq: Frequency = self.freq.parse()?;

        if self.context_length == 0 {
            return Err(Self::invalid("context_length must be positive"));
        }
        if self.prediction_length == 0 {
            return Err(Self::invalid("prediction_length must be positive"));
        }
        if self.num_layers == 0 || self.hidden_size == 0 {
            return Err(Self::invalid("num_layers and hidden_size must be positive"));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(Self::invalid("dropout_rate must be in [0, 1)"));
        }
        if self.num_parallel_samples == 0 {
            return Err(Self::invalid("num_parallel_samples must be positive"));
        }
        if self.cardinality.len() != self.num_feat_static_cat {
            return Err(Self::invalid(format!(
                "expected {} cardinalities, got {}",
                self.num_feat_static_cat,
                self.cardinality.len()
            )));
        }
        if self.cardinality.iter().any(|c| *c == 0) {
            return Err(Self::invalid("cardinalities must be positive"));
        }

        let embedding_dimension = match &self.embedding_dimension {
            Some(dimension) if dimension.len() != self.cardinality.len() => {
                return Err(Self::invalid(format!(
                    "expected {} embedding dimensions, got {}",
                    self.cardinality.len(),
                    dimension.len()
                )))
            }
            Some(dimension) => dimension.clone(),
            None => self
                .cardinality
                .iter()
                .map(|c| default_embedding_dimension(*c))
                .collect(),
        };

        let lags = match &self.lags_seq {
            Some(lags) => lags.clone(),
            None => default_lags_for_frequency(&freq),
        };
        if lags.is_empty() || lags.contains(&0) {
            return Err(Self::invalid("lags must be non-empty and start at 1"));
        }
        let lags_seq: Vec<usize> = lags.iter().map(|lag| lag - 1).collect();
        let max_lag = lags_seq.iter().copied().max().unwrap_or(0);

        let num_time_feat =
            1 + self.num_feat_dynamic_real + time_features_from_frequency(&freq).len();
        let num_static_feat =
            embedding_dimension.iter().sum::<usize>() + self.num_feat_static_real + 1;

        Ok(RnnLayout {
            context_length: self.context_length,
            prediction_length: self.prediction_length,
            past_length: self.context_length + max_lag,
            rnn_input_size: lags_seq.len() + num_static_feat + num_time_feat,
            lags_seq,
            num_time_feat,
            num_feat_static_real: self.num_feat_static_real,
            num_feat_static_cat: self.num_feat_static_cat,
            cardinality: self.cardinality.clone(),
            embedding_dimension,
            num_static_feat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly() -> DeepArConfig {
        DeepArConfig::new("1H", 24, 12)
            .with_num_feat_dynamic_real(1)
            .with_num_feat_static_real(1)
            .with_num_feat_static_cat(1)
            .with_cardinality(vec![1])
    }

    #[test]
    fn test_hourly_layout() {
        let layout = hourly().layout().unwrap();

        assert_eq!(layout.lags_seq.len(), 40);
        assert_eq!(layout.lags_seq[0], 0);
        assert_eq!(layout.past_length, 24 + 720);
        assert_eq!(layout.num_time_feat, 6);
        assert_eq!(layout.embedding_dimension, vec![1]);
        assert_eq!(layout.num_static_feat, 3);
        assert_eq!(layout.rnn_input_size, 40 + 3 + 6);
    }

    #[test]
    fn test_custom_lags() {
        let layout = hourly().with_lags_seq(vec![1, 2, 24]).layout().unwrap();
        assert_eq!(layout.lags_seq, vec![0, 1, 23]);
        assert_eq!(layout.past_length, 47);
    }

    #[test]
    fn test_validation() {
        assert!(hourly().with_cardinality(vec![]).layout().is_err());
        assert!(hourly().with_embedding_dimension(vec![2, 2]).layout().is_err());
        assert!(DeepArConfig::new("1H", 0, 12).layout().is_err());
        assert!(DeepArConfig::new("1H", 24, 0).layout().is_err());
        assert!(DeepArConfig::new("1X", 24, 12).layout().is_err());
        assert!(hourly().with_lags_seq(vec![0, 1]).layout().is_err());
        assert!(hourly().with_dropout_rate(1.0).layout().is_err());
    }

    #[test]
    fn test_config_serializes() {
        let config = hourly();
        let json = serde_json::to_string(&config).unwrap();
        let restored: DeepArConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
