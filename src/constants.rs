// Sampling
pub const DEFAULT_NUM_PARALLEL_SAMPLES: usize = 100; // Sample paths drawn per series

// Recurrent network defaults
pub const DEFAULT_HIDDEN_SIZE: usize = 40;
pub const DEFAULT_NUM_LAYERS: usize = 2;
pub const DEFAULT_DROPOUT_RATE: f64 = 0.1;

// Feedforward defaults
pub const DEFAULT_FEEDFORWARD_HIDDEN_DIMENSIONS: [usize; 2] = [20, 20];

// Lags
pub const DEFAULT_LAG_UPPER_BOUND: usize = 1200;
pub const NUM_DEFAULT_LAGS: usize = 7; // Lags 1..=7 are always included

// Embeddings
pub const MAX_EMBEDDING_DIMENSION: usize = 50;

// Numerical floors
pub const MINIMUM_SCALE: f64 = 1e-10;
pub const DISTRIBUTION_EPS: f64 = 1e-6;

// MQF2 quantile map
pub const DEFAULT_QUANTILE_MAP_UNITS: usize = 30;
pub const DEFAULT_ES_NUM_SAMPLES: usize = 50;
pub const DEFAULT_ES_BETA: f64 = 1.0;
pub const DEFAULT_THRESHOLD_INPUT: f64 = 100.0;
