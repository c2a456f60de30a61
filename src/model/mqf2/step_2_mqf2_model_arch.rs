// External imports
use burn::module::{Ignored, Module};
use burn::tensor::{backend::Backend, Int, Tensor};
use log::info;

// Internal imports
use super::step_1_mqf2_config::Mqf2Config;
use crate::error::Result;
use crate::model::deepar::{LaggedRnn, RnnInputs};
use crate::model::{ForecastModule, InputShapes, InputTypes};
use crate::nn::quantile_map::QuantileMap;
use crate::util::batch_builder::Batch;
use crate::util::tensor_tree::TensorTree;

/// Lagged-RNN encoder followed by a joint quantile function over all horizons.
#[derive(Module, Debug)]
pub struct Mqf2MultiHorizonModel<B: Backend> {
    config: Ignored<Mqf2Config>,
    rnn: LaggedRnn<B>,
    quantile_map: QuantileMap<B>,
}

impl<B: Backend> Mqf2MultiHorizonModel<B> {
    /// Create a new MQF2 model
    ///
    /// # Arguments
    ///
    /// * `config` - Model configuration, validated here
    /// * `device` - Device to place tensors on
    pub fn new(config: Mqf2Config, device: &B::Device) -> Result<Self> {
        let layout = config.layout()?;
        info!(
            "Creating MQF2 model: context {}, {} jointly modelled horizons",
            layout.context_length, layout.prediction_length
        );

        let prediction_length = layout.prediction_length;
        let rnn = LaggedRnn::new(
            layout,
            config.rnn.hidden_size,
            config.rnn.num_layers,
            config.rnn.dropout_rate,
            config.rnn.scaling,
            device,
        );
        let quantile_map = QuantileMap::new(
            prediction_length,
            config.rnn.hidden_size,
            config.quantile_map_units,
            device,
        );

        Ok(Self {
            config: Ignored(config),
            rnn,
            quantile_map,
        })
    }

    pub fn config(&self) -> &Mqf2Config {
        &self.config.0
    }

    /// Forward pass drawing `num_parallel_samples` joint samples per series
    ///
    /// # Returns
    ///
    /// Samples of shape `[batch_size, num_parallel_samples, prediction_length]`
    #[allow(clippy::too_many_arguments)]
    pub fn forward(
        &self,
        feat_static_cat: Tensor<B, 2, Int>,
        feat_static_real: Tensor<B, 2>,
        past_time_feat: Tensor<B, 3>,
        past_target: Tensor<B, 2>,
        past_observed_values: Tensor<B, 2>,
        future_time_feat: Tensor<B, 3>,
        num_parallel_samples: Option<usize>,
    ) -> Result<Tensor<B, 3>> {
        let inputs = RnnInputs {
            feat_static_cat,
            feat_static_real,
            past_time_feat,
            past_target,
            past_observed_values,
            future_time_feat,
        };
        self.rnn.validate(&inputs)?;

        let num_samples = num_parallel_samples.unwrap_or(self.config().rnn.num_parallel_samples);
        let hidden = self.encode(&inputs)?;
        let [batch_size, _] = hidden.dims();

        let unscaled = self.quantile_map.sample(hidden.hidden, num_samples);
        let scale = hidden.scale.reshape([batch_size, 1, 1]);
        Ok(unscaled * scale)
    }

    /// Push given reference points through the quantile map.
    ///
    /// `z` has shape `[batch_size, num_samples, prediction_length]`.
    pub fn quantiles(&self, inputs: &RnnInputs<B>, z: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        self.rnn.validate(inputs)?;
        let hidden = self.encode(inputs)?;
        let [batch_size, _] = hidden.dims();
        Ok(self.quantile_map.forward(z, hidden.hidden) * hidden.scale.reshape([batch_size, 1, 1]))
    }

    /// Last context hidden state, clamped to the input threshold, and the target scale.
    fn encode(&self, inputs: &RnnInputs<B>) -> Result<Encoded<B>> {
        let unrolled = self.rnn.unroll(inputs)?;
        let [batch_size, context_length, hidden_size] = unrolled.output.dims();
        let threshold = self.config().threshold_input;

        let hidden = unrolled
            .output
            .narrow(1, context_length - 1, 1)
            .reshape([batch_size, hidden_size])
            .clamp(-threshold, threshold);

        Ok(Encoded {
            hidden,
            scale: unrolled.scale,
        })
    }
}

struct Encoded<B: Backend> {
    hidden: Tensor<B, 2>,
    scale: Tensor<B, 2>,
}

impl<B: Backend> Encoded<B> {
    fn dims(&self) -> [usize; 2] {
        self.hidden.dims()
    }
}

impl<B: Backend> ForecastModule<B> for Mqf2MultiHorizonModel<B> {
    fn input_shapes(&self, batch_size: usize) -> InputShapes {
        self.rnn.input_shapes(batch_size)
    }

    fn input_types(&self) -> InputTypes {
        self.rnn.input_types()
    }

    fn forward_batch(&self, batch: Batch<B>) -> Result<TensorTree<B>> {
        let samples = self.forward(
            batch.int2("feat_static_cat")?,
            batch.float2("feat_static_real")?,
            batch.float3("past_time_feat")?,
            batch.float2("past_target")?,
            batch.float2("past_observed_values")?,
            batch.float3("future_time_feat")?,
            None,
        )?;
        Ok(TensorTree::leaf(samples))
    }
}
