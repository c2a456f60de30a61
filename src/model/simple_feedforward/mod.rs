pub mod step_1_feedforward_model_arch;

pub use step_1_feedforward_model_arch::{
    FeedForwardOutput, SimpleFeedForwardConfig, SimpleFeedForwardModel,
};
