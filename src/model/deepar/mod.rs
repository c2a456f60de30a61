pub mod step_1_deepar_config;
pub mod step_2_lagged_rnn;
pub mod step_3_deepar_model_arch;

pub use step_1_deepar_config::{DeepArConfig, RnnLayout};
pub use step_2_lagged_rnn::{LaggedRnn, RnnInputs, Unrolled};
pub use step_3_deepar_model_arch::DeepArModel;
