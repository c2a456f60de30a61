// External imports
use burn::module::{Ignored, Module};
use burn::tensor::{backend::Backend, Int, Tensor};
use log::{debug, info};
use rand::Rng;

// Internal imports
use super::step_1_deepar_config::DeepArConfig;
use super::step_2_lagged_rnn::{LaggedRnn, RnnInputs};
use crate::error::Result;
use crate::model::{ForecastModule, InputShapes, InputTypes};
use crate::nn::lstm::repeat_interleave_rows;
use crate::nn::student_t::StudentTOutput;
use crate::util::batch_builder::Batch;
use crate::util::tensor_tree::TensorTree;

/// Autoregressive RNN model producing Student-t sample paths.
#[derive(Module, Debug)]
pub struct DeepArModel<B: Backend> {
    config: Ignored<DeepArConfig>,
    rnn: LaggedRnn<B>,
    param_proj: StudentTOutput<B>,
}

impl<B: Backend> DeepArModel<B> {
    /// Create a new DeepAR model
    ///
    /// # Arguments
    ///
    /// * `config` - Model configuration, validated here
    /// * `device` - Device to place tensors on
    pub fn new(config: DeepArConfig, device: &B::Device) -> Result<Self> {
        let layout = config.layout()?;
        info!(
            "Creating DeepAR model: context {}, prediction {}, {} lags, past length {}",
            layout.context_length,
            layout.prediction_length,
            layout.lags_seq.len(),
            layout.past_length
        );

        let rnn = LaggedRnn::new(
            layout,
            config.hidden_size,
            config.num_layers,
            config.dropout_rate,
            config.scaling,
            device,
        );
        let param_proj = StudentTOutput::new(config.hidden_size, device);

        Ok(Self {
            config: Ignored(config),
            rnn,
            param_proj,
        })
    }

    pub fn config(&self) -> &DeepArConfig {
        &self.config.0
    }

    pub fn past_length(&self) -> usize {
        self.rnn.layout().past_length
    }

    /// Forward pass drawing `num_parallel_samples` paths per series
    ///
    /// # Returns
    ///
    /// Sample paths of shape `[batch_size, num_parallel_samples, prediction_length]`
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
        self.sample_paths(&inputs, num_parallel_samples, &mut rand::rng())
    }

    /// Draw sample paths with an explicit random source.
    pub fn sample_paths<R: Rng>(
        &self,
        inputs: &RnnInputs<B>,
        num_parallel_samples: Option<usize>,
        rng: &mut R,
    ) -> Result<Tensor<B, 3>> {
        self.rnn.validate(inputs)?;
        let num_samples = num_parallel_samples.unwrap_or(self.config().num_parallel_samples);
        let prediction_length = self.config().prediction_length;
        let [batch_size, _, num_time_feat] = inputs.future_time_feat.dims();

        let unrolled = self.rnn.unroll(inputs)?;
        let params = self.param_proj.forward(unrolled.output);

        let repeated_scale = repeat_interleave_rows(unrolled.scale, num_samples);
        let repeated_static_feat =
            repeat_interleave_rows(unrolled.static_feat, num_samples).unsqueeze_dim::<3>(1);
        let mut repeated_past_target =
            repeat_interleave_rows(inputs.past_target.clone(), num_samples) / repeated_scale.clone();
        let repeated_time_feat = repeat_interleave_rows(
            inputs
                .future_time_feat
                .clone()
                .reshape([batch_size, prediction_length * num_time_feat]),
            num_samples,
        )
        .reshape([batch_size * num_samples, prediction_length, num_time_feat]);
        let mut repeated_state = unrolled.state.repeat_interleave(num_samples);

        let distr = params.trailing(1).repeat_interleave(num_samples);
        let mut next_sample = distr.sample(rng, Some(repeated_scale.clone()))?;
        let mut future_samples = Vec::with_capacity(prediction_length);
        future_samples.push(next_sample.clone());

        for k in 1..prediction_length {
            let scaled_next_sample = next_sample / repeated_scale.clone();
            let (output, state) = self.rnn.step(
                repeated_past_target.clone(),
                scaled_next_sample.clone(),
                repeated_static_feat.clone(),
                repeated_time_feat.clone().narrow(1, k, 1),
                repeated_state,
            )?;
            repeated_state = state;
            repeated_past_target = Tensor::cat(vec![repeated_past_target, scaled_next_sample], 1);

            let distr = self.param_proj.forward(output);
            next_sample = distr.sample(rng, Some(repeated_scale.clone()))?;
            future_samples.push(next_sample.clone());
        }
        debug!(
            "Sampled {} paths of length {} for {} series",
            num_samples, prediction_length, batch_size
        );

        Ok(Tensor::cat(future_samples, 1).reshape([batch_size, num_samples, prediction_length]))
    }
}

impl<B: Backend> ForecastModule<B> for DeepArModel<B> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;
    use crate::nn::student_t::to_host;
    use burn_ndarray::{NdArray, NdArrayDevice};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> DeepArConfig {
        DeepArConfig::new("1H", 8, 4)
            .with_num_feat_dynamic_real(1)
            .with_num_feat_static_cat(1)
            .with_cardinality(vec![3])
            .with_lags_seq(vec![1, 2, 3, 24])
            .with_hidden_size(12)
            .with_num_parallel_samples(5)
    }

    fn small_inputs(model: &DeepArModel<NdArray>, batch_size: usize, device: &NdArrayDevice) -> RnnInputs<NdArray> {
        let layout = model.rnn.layout();
        RnnInputs {
            feat_static_cat: Tensor::<NdArray, 2, Int>::from_ints([[0], [2]], device)
                .narrow(0, 0, batch_size),
            feat_static_real: Tensor::zeros([batch_size, 0], device),
            past_time_feat: Tensor::zeros([batch_size, layout.past_length, layout.num_time_feat], device),
            past_target: Tensor::full([batch_size, layout.past_length], 10.0, device),
            past_observed_values: Tensor::ones([batch_size, layout.past_length], device),
            future_time_feat: Tensor::zeros([batch_size, 4, layout.num_time_feat], device),
        }
    }

    #[test]
    fn test_sample_paths_shape() {
        let device = NdArrayDevice::default();
        let model: DeepArModel<NdArray> = DeepArModel::new(small_config(), &device).unwrap();
        let inputs = small_inputs(&model, 2, &device);

        let mut rng = StdRng::seed_from_u64(3);
        let samples = model.sample_paths(&inputs, None, &mut rng).unwrap();
        assert_eq!(samples.dims(), [2, 5, 4]);

        let values = to_host(samples).unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_num_parallel_samples_override() {
        let device = NdArrayDevice::default();
        let model: DeepArModel<NdArray> = DeepArModel::new(small_config(), &device).unwrap();
        let inputs = small_inputs(&model, 1, &device);

        let mut rng = StdRng::seed_from_u64(3);
        let samples = model.sample_paths(&inputs, Some(7), &mut rng).unwrap();
        assert_eq!(samples.dims(), [1, 7, 4]);
    }

    #[test]
    fn test_same_seed_same_paths() {
        let device = NdArrayDevice::default();
        let model: DeepArModel<NdArray> = DeepArModel::new(small_config(), &device).unwrap();
        let inputs = small_inputs(&model, 2, &device);

        let first = model
            .sample_paths(&inputs, None, &mut StdRng::seed_from_u64(11))
            .unwrap();
        let second = model
            .sample_paths(&inputs, None, &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert_eq!(to_host(first).unwrap(), to_host(second).unwrap());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let device = NdArrayDevice::default();
        let config = small_config().with_cardinality(vec![3, 4]);
        assert!(matches!(
            DeepArModel::<NdArray>::new(config, &device),
            Err(ModuleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        let device = NdArrayDevice::default();
        let model: DeepArModel<NdArray> = DeepArModel::new(small_config(), &device).unwrap();
        let batch = crate::util::batch_builder::construct_batch(&model, 0, &device).unwrap();

        assert!(matches!(
            model.forward_batch(batch),
            Err(ModuleError::EmptyBatch)
        ));
    }

    #[test]
    fn test_forward_batch_rejects_wrong_kind() {
        let device = NdArrayDevice::default();
        let model: DeepArModel<NdArray> = DeepArModel::new(small_config(), &device).unwrap();
        let mut batch = crate::util::batch_builder::construct_batch(&model, 2, &device).unwrap();
        batch.push("feat_static_cat", Tensor::<NdArray, 2>::zeros([2, 1], &device));

        assert!(matches!(
            model.forward_batch(batch),
            Err(ModuleError::InputKind { .. })
        ));
    }
}
