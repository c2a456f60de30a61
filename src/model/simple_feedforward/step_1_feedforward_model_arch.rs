// External imports
use burn::module::{Ignored, Module};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};
use log::info;
use serde::{Deserialize, Serialize};

// Internal imports
use crate::constants::DEFAULT_FEEDFORWARD_HIDDEN_DIMENSIONS;
use crate::error::{ModuleError, Result};
use crate::model::{ForecastModule, InputShapes, InputTypes};
use crate::nn::scaler::Scaler;
use crate::nn::student_t::{StudentT, StudentTOutput};
use crate::util::batch_builder::Batch;
use crate::util::tensor_tree::{float_dtype, TensorTree};

/// Configuration for the [`SimpleFeedForwardModel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleFeedForwardConfig {
    pub context_length: usize,
    pub prediction_length: usize,
    pub hidden_dimensions: Vec<usize>,
}

impl SimpleFeedForwardConfig {
    pub fn new(context_length: usize, prediction_length: usize) -> Self {
        Self {
            context_length,
            prediction_length,
            hidden_dimensions: DEFAULT_FEEDFORWARD_HIDDEN_DIMENSIONS.to_vec(),
        }
    }

    pub fn with_hidden_dimensions(mut self, hidden_dimensions: Vec<usize>) -> Self {
        self.hidden_dimensions = hidden_dimensions;
        self
    }

    /// Initialize a model from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<SimpleFeedForwardModel<B>> {
        SimpleFeedForwardModel::new(self.clone(), device)
    }
}

/// Output of a feedforward forward pass.
pub struct FeedForwardOutput<B: Backend> {
    /// Student-t parameters, each `[batch_size, prediction_length]`
    pub distr_args: StudentT<B>,
    /// Location of the target scaling `[batch_size, 1]`
    pub loc: Tensor<B, 2>,
    /// Scale of the target scaling `[batch_size, 1]`
    pub scale: Tensor<B, 2>,
}

impl<B: Backend> FeedForwardOutput<B> {
    pub fn into_tree(self) -> TensorTree<B> {
        TensorTree::node(vec![
            TensorTree::node(
                self.distr_args
                    .into_args()
                    .into_iter()
                    .map(TensorTree::leaf)
                    .collect(),
            ),
            TensorTree::leaf(self.loc),
            TensorTree::leaf(self.scale),
        ])
    }
}

/// MLP mapping the scaled context window to Student-t parameters for every horizon.
#[derive(Module, Debug)]
pub struct SimpleFeedForwardModel<B: Backend> {
    config: Ignored<SimpleFeedForwardConfig>,
    hidden_layers: Vec<Linear<B>>,
    output_layer: Linear<B>,
    args_proj: StudentTOutput<B>,
}

impl<B: Backend> SimpleFeedForwardModel<B> {
    /// Create a new feedforward model
    ///
    /// # Arguments
    ///
    /// * `config` - Model configuration, validated here
    /// * `device` - Device to place tensors on
    pub fn new(config: SimpleFeedForwardConfig, device: &B::Device) -> Result<Self> {
        if config.context_length == 0 || config.prediction_length == 0 {
            return Err(ModuleError::InvalidConfig(
                "context_length and prediction_length must be positive".to_string(),
            ));
        }
        let Some(&last_hidden) = config.hidden_dimensions.last() else {
            return Err(ModuleError::InvalidConfig(
                "at least one hidden dimension is required".to_string(),
            ));
        };
        if config.hidden_dimensions.contains(&0) {
            return Err(ModuleError::InvalidConfig(
                "hidden dimensions must be positive".to_string(),
            ));
        }
        info!(
            "Creating feedforward model: context {}, prediction {}, hidden {:?}",
            config.context_length, config.prediction_length, config.hidden_dimensions
        );

        let mut in_size = config.context_length;
        let hidden_layers = config
            .hidden_dimensions
            .iter()
            .map(|&out_size| {
                let layer = LinearConfig::new(in_size, out_size).init(device);
                in_size = out_size;
                layer
            })
            .collect();
        let output_layer =
            LinearConfig::new(last_hidden, config.prediction_length * last_hidden).init(device);
        let args_proj = StudentTOutput::new(last_hidden, device);

        Ok(Self {
            config: Ignored(config),
            hidden_layers,
            output_layer,
            args_proj,
        })
    }

    pub fn config(&self) -> &SimpleFeedForwardConfig {
        &self.config.0
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `past_target` - Context window of shape `[batch_size, context_length]`
    pub fn forward(&self, past_target: Tensor<B, 2>) -> Result<FeedForwardOutput<B>> {
        let config = self.config();
        let [batch_size, context_length] = past_target.dims();
        if batch_size == 0 {
            return Err(ModuleError::EmptyBatch);
        }
        if context_length != config.context_length {
            return Err(ModuleError::InputShape {
                name: "past_target".to_string(),
                expected: vec![batch_size, config.context_length],
                actual: vec![batch_size, context_length],
            });
        }

        let observed = Tensor::ones_like(&past_target);
        let scaled = Scaler::from_flag(true).scale(past_target, observed);

        let mut x = scaled.data;
        for layer in &self.hidden_layers {
            x = activation::relu(layer.forward(x));
        }
        let last_hidden = self.args_proj.in_features();
        let nn_out = self
            .output_layer
            .forward(x)
            .reshape([batch_size, config.prediction_length, last_hidden]);

        Ok(FeedForwardOutput {
            distr_args: self.args_proj.forward(nn_out),
            loc: scaled.loc,
            scale: scaled.scale,
        })
    }
}

impl<B: Backend> ForecastModule<B> for SimpleFeedForwardModel<B> {
    fn input_shapes(&self, batch_size: usize) -> InputShapes {
        vec![("past_target", vec![batch_size, self.config().context_length])]
    }

    fn input_types(&self) -> InputTypes {
        InputTypes::from([("past_target", float_dtype::<B>())])
    }

    fn forward_batch(&self, batch: Batch<B>) -> Result<TensorTree<B>> {
        Ok(self.forward(batch.float2("past_target")?)?.into_tree())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::student_t::to_host;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_output_shapes() {
        let device = NdArrayDevice::default();
        let model: SimpleFeedForwardModel<NdArray> =
            SimpleFeedForwardConfig::new(10, 5).init(&device).unwrap();

        let past_target = Tensor::<NdArray, 2>::ones([3, 10], &device);
        let output = model.forward(past_target).unwrap();

        assert_eq!(output.distr_args.df.dims(), [3, 5]);
        assert_eq!(output.distr_args.loc.dims(), [3, 5]);
        assert_eq!(output.distr_args.scale.dims(), [3, 5]);
        assert_eq!(output.loc.dims(), [3, 1]);
        assert_eq!(output.scale.dims(), [3, 1]);
    }

    #[test]
    fn test_scale_and_loc_values() {
        let device = NdArrayDevice::default();
        let model: SimpleFeedForwardModel<NdArray> =
            SimpleFeedForwardConfig::new(4, 2).init(&device).unwrap();

        let past_target = Tensor::<NdArray, 2>::from_floats([[1.0, -3.0, 1.0, 3.0]], &device);
        let output = model.forward(past_target).unwrap();

        assert_eq!(to_host(output.scale).unwrap(), vec![2.0]);
        assert_eq!(to_host(output.loc).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_custom_hidden_dimensions() {
        let device = NdArrayDevice::default();
        let model: SimpleFeedForwardModel<NdArray> = SimpleFeedForwardConfig::new(6, 3)
            .with_hidden_dimensions(vec![16, 8, 4])
            .init(&device)
            .unwrap();

        let output = model.forward(Tensor::zeros([2, 6], &device)).unwrap();
        assert_eq!(output.distr_args.df.dims(), [2, 3]);
    }

    #[test]
    fn test_rejects_wrong_context_length() {
        let device = NdArrayDevice::default();
        let model: SimpleFeedForwardModel<NdArray> =
            SimpleFeedForwardConfig::new(6, 3).init(&device).unwrap();

        assert!(matches!(
            model.forward(Tensor::zeros([2, 5], &device)),
            Err(ModuleError::InputShape { .. })
        ));
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        let device = NdArrayDevice::default();
        let model: SimpleFeedForwardModel<NdArray> =
            SimpleFeedForwardConfig::new(6, 3).init(&device).unwrap();

        let batch = crate::util::batch_builder::construct_batch(&model, 0, &device).unwrap();
        assert!(matches!(
            model.forward_batch(batch),
            Err(ModuleError::EmptyBatch)
        ));
    }

    #[test]
    fn test_rejects_empty_hidden_dimensions() {
        let device = NdArrayDevice::default();
        let result = SimpleFeedForwardConfig::new(6, 3)
            .with_hidden_dimensions(vec![])
            .init::<NdArray>(&device);
        assert!(result.is_err());
    }
}
