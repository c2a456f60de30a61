//! Network building blocks shared by the forecasting models.
pub mod feature_embedder;
pub mod lagged;
pub mod lstm;
pub mod quantile_map;
pub mod scaler;
pub mod student_t;
