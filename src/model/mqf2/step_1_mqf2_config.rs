// External imports
use serde::{Deserialize, Serialize};

// Internal imports
use crate::constants::{
    DEFAULT_ES_BETA, DEFAULT_ES_NUM_SAMPLES, DEFAULT_QUANTILE_MAP_UNITS, DEFAULT_THRESHOLD_INPUT,
};
use crate::error::{ModuleError, Result};
use crate::model::deepar::{DeepArConfig, RnnLayout};

/// Configuration of the multi-horizon quantile-function model.
///
/// The encoder is the same lagged RNN as DeepAR; the remaining fields
/// configure the quantile map and its energy-score objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mqf2Config {
    pub rnn: DeepArConfig,
    pub quantile_map_units: usize,
    pub threshold_input: f64,
    pub es_num_samples: usize,
    pub beta: f64,
    pub estimate_logdet: bool,
}

impl Mqf2Config {
    pub fn new(rnn: DeepArConfig) -> Self {
        Self {
            rnn,
            quantile_map_units: DEFAULT_QUANTILE_MAP_UNITS,
            threshold_input: DEFAULT_THRESHOLD_INPUT,
            es_num_samples: DEFAULT_ES_NUM_SAMPLES,
            beta: DEFAULT_ES_BETA,
            estimate_logdet: false,
        }
    }

    pub fn with_quantile_map_units(mut self, units: usize) -> Self {
        self.quantile_map_units = units;
        self
    }

    pub fn with_threshold_input(mut self, threshold: f64) -> Self {
        self.threshold_input = threshold;
        self
    }

    pub fn with_es_num_samples(mut self, num: usize) -> Self {
        self.es_num_samples = num;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_estimate_logdet(mut self, estimate: bool) -> Self {
        self.estimate_logdet = estimate;
        self
    }

    /// Validate and derive the encoder layout.
    pub fn layout(&self) -> Result<RnnLayout> {
        if self.quantile_map_units == 0 {
            return Err(ModuleError::InvalidConfig(
                "quantile_map_units must be positive".to_string(),
            ));
        }
        if self.threshold_input <= 0.0 {
            return Err(ModuleError::InvalidConfig(
                "threshold_input must be positive".to_string(),
            ));
        }
        if !(self.beta > 0.0 && self.beta < 2.0) {
            return Err(ModuleError::InvalidConfig(
                "beta must be in (0, 2)".to_string(),
            ));
        }
        self.rnn.layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_validation() {
        let config = Mqf2Config::new(DeepArConfig::new("1H", 24, 12));
        assert_eq!(config.quantile_map_units, DEFAULT_QUANTILE_MAP_UNITS);
        assert!(config.layout().is_ok());

        assert!(config.clone().with_beta(2.0).layout().is_err());
        assert!(config.clone().with_quantile_map_units(0).layout().is_err());
        assert!(config.with_threshold_input(0.0).layout().is_err());
    }
}
