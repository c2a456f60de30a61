pub mod step_1_mqf2_config;
pub mod step_2_mqf2_model_arch;

pub use step_1_mqf2_config::Mqf2Config;
pub use step_2_mqf2_model_arch::Mqf2MultiHorizonModel;
