// External imports
use burn::module::{Ignored, Module};
use burn::tensor::{backend::Backend, DType, Int, Tensor};
use log::debug;

// Internal imports
use super::step_1_deepar_config::RnnLayout;
use crate::error::{ModuleError, Result};
use crate::model::{InputShapes, InputTypes};
use crate::nn::feature_embedder::FeatureEmbedder;
use crate::nn::lagged::lagged_sequence_values;
use crate::nn::lstm::{LstmState, StackedLstm};
use crate::nn::scaler::Scaler;
use crate::util::tensor_tree::{float_dtype, int_dtype};

/// Inputs shared by the lagged-RNN models, in positional order.
pub struct RnnInputs<B: Backend> {
    pub feat_static_cat: Tensor<B, 2, Int>,
    pub feat_static_real: Tensor<B, 2>,
    pub past_time_feat: Tensor<B, 3>,
    pub past_target: Tensor<B, 2>,
    pub past_observed_values: Tensor<B, 2>,
    pub future_time_feat: Tensor<B, 3>,
}

/// Result of unrolling the RNN over the context window.
pub struct Unrolled<B: Backend> {
    /// Top-layer outputs `[batch_size, context_length, hidden_size]`
    pub output: Tensor<B, 3>,
    /// Target scale `[batch_size, 1]`
    pub scale: Tensor<B, 2>,
    /// Static features `[batch_size, num_static_feat]`
    pub static_feat: Tensor<B, 2>,
    pub state: LstmState<B>,
}

/// Static embedder plus stacked LSTM fed with lagged, scaled targets.
#[derive(Module, Debug)]
pub struct LaggedRnn<B: Backend> {
    layout: Ignored<RnnLayout>,
    scaling: bool,
    embedder: FeatureEmbedder<B>,
    lstm: StackedLstm<B>,
}

impl<B: Backend> LaggedRnn<B> {
    /// Create the embedder and LSTM for a validated layout
    ///
    /// # Arguments
    ///
    /// * `layout` - Sizes derived from the model configuration
    /// * `hidden_size` - LSTM hidden size
    /// * `num_layers` - Number of LSTM layers
    /// * `dropout_rate` - Dropout between LSTM layers
    /// * `scaling` - Whether the target is mean-scaled
    /// * `device` - Device to place tensors on
    pub fn new(
        layout: RnnLayout,
        hidden_size: usize,
        num_layers: usize,
        dropout_rate: f64,
        scaling: bool,
        device: &B::Device,
    ) -> Self {
        let embedder = FeatureEmbedder::new(&layout.cardinality, &layout.embedding_dimension, device);
        let lstm = StackedLstm::new(
            layout.rnn_input_size,
            hidden_size,
            num_layers,
            dropout_rate,
            device,
        );

        Self {
            layout: Ignored(layout),
            scaling,
            embedder,
            lstm,
        }
    }

    pub fn layout(&self) -> &RnnLayout {
        &self.layout.0
    }

    pub fn hidden_size(&self) -> usize {
        self.lstm.hidden_size()
    }

    /// Input shapes shared by every lagged-RNN model.
    pub fn input_shapes(&self, batch_size: usize) -> InputShapes {
        let layout = self.layout();
        vec![
            ("feat_static_cat", vec![batch_size, layout.num_feat_static_cat]),
            ("feat_static_real", vec![batch_size, layout.num_feat_static_real]),
            (
                "past_time_feat",
                vec![batch_size, layout.past_length, layout.num_time_feat],
            ),
            ("past_target", vec![batch_size, layout.past_length]),
            ("past_observed_values", vec![batch_size, layout.past_length]),
            (
                "future_time_feat",
                vec![batch_size, layout.prediction_length, layout.num_time_feat],
            ),
        ]
    }

    /// Input dtypes shared by every lagged-RNN model.
    pub fn input_types(&self) -> InputTypes {
        let float: DType = float_dtype::<B>();
        InputTypes::from([
            ("feat_static_cat", int_dtype::<B>()),
            ("feat_static_real", float),
            ("past_time_feat", float),
            ("past_target", float),
            ("past_observed_values", float),
            ("future_time_feat", float),
        ])
    }

    /// Check that the inputs agree with the layout.
    pub fn validate(&self, inputs: &RnnInputs<B>) -> Result<()> {
        let layout = self.layout();
        let [batch_size, num_cat] = inputs.feat_static_cat.dims();
        if batch_size == 0 {
            return Err(ModuleError::EmptyBatch);
        }

        let expect = |name: &str, expected: Vec<usize>, actual: Vec<usize>| -> Result<()> {
            if expected == actual {
                Ok(())
            } else {
                Err(ModuleError::InputShape {
                    name: name.to_string(),
                    expected,
                    actual,
                })
            }
        };

        expect(
            "feat_static_cat",
            vec![batch_size, layout.num_feat_static_cat],
            vec![batch_size, num_cat],
        )?;
        expect(
            "feat_static_real",
            vec![batch_size, layout.num_feat_static_real],
            inputs.feat_static_real.dims().to_vec(),
        )?;
        expect(
            "past_target",
            vec![batch_size, layout.past_length],
            inputs.past_target.dims().to_vec(),
        )?;
        expect(
            "past_observed_values",
            vec![batch_size, layout.past_length],
            inputs.past_observed_values.dims().to_vec(),
        )?;
        expect(
            "past_time_feat",
            vec![batch_size, layout.past_length, layout.num_time_feat],
            inputs.past_time_feat.dims().to_vec(),
        )?;
        expect(
            "future_time_feat",
            vec![batch_size, layout.prediction_length, layout.num_time_feat],
            inputs.future_time_feat.dims().to_vec(),
        )
    }

    /// Unroll the RNN over the context window.
    ///
    /// Each step's input is the scaled target at `t` with its lags, the static
    /// features, and the time features of step `t + 1`; the last context step
    /// therefore uses the first future time feature.
    pub fn unroll(&self, inputs: &RnnInputs<B>) -> Result<Unrolled<B>> {
        let layout = self.layout();
        let context_length = layout.context_length;
        let [batch_size, past_length] = inputs.past_target.dims();
        if past_length < context_length {
            return Err(ModuleError::InputShape {
                name: "past_target".to_string(),
                expected: vec![batch_size, layout.past_length],
                actual: vec![batch_size, past_length],
            });
        }
        let prior_length = past_length - context_length;

        let context = inputs
            .past_target
            .clone()
            .narrow(1, prior_length, context_length);
        let observed_context = inputs
            .past_observed_values
            .clone()
            .narrow(1, prior_length, context_length);

        let scaled = Scaler::from_flag(self.scaling).scale(context, observed_context);
        let scale = scaled.scale;
        let prior_input = inputs.past_target.clone().narrow(1, 0, prior_length) / scale.clone();

        let static_feat = self.static_features(
            inputs.feat_static_cat.clone(),
            inputs.feat_static_real.clone(),
            scale.clone(),
        );

        let mut time_parts = Vec::with_capacity(2);
        if context_length > 1 {
            time_parts.push(inputs.past_time_feat.clone().narrow(
                1,
                past_length - context_length + 1,
                context_length - 1,
            ));
        }
        time_parts.push(inputs.future_time_feat.clone().narrow(1, 0, 1));
        let time_feat = Tensor::cat(time_parts, 1);

        let expanded_static = static_feat
            .clone()
            .unsqueeze_dim::<3>(1)
            .repeat_dim(1, context_length);
        let features = Tensor::cat(vec![expanded_static, time_feat], 2);

        let lags = lagged_sequence_values(&layout.lags_seq, prior_input, scaled.data)?;
        let rnn_input = Tensor::cat(vec![lags, features], 2);
        debug!(
            "Unrolling lagged RNN over {} steps for {} series with input {:?}",
            context_length,
            batch_size,
            rnn_input.dims()
        );

        let (output, state) = self.lstm.forward(rnn_input, None);

        Ok(Unrolled {
            output,
            scale,
            static_feat,
            state,
        })
    }

    /// Advance the RNN by one step from `state`.
    ///
    /// # Arguments
    ///
    /// * `history` - Scaled history the lags are read from, `[n, history_len]`
    /// * `next_value` - Scaled newest value `[n, 1]`
    /// * `static_feat` - Static features `[n, 1, num_static_feat]`
    /// * `time_feat` - Time features of the next step `[n, 1, num_time_feat]`
    pub fn step(
        &self,
        history: Tensor<B, 2>,
        next_value: Tensor<B, 2>,
        static_feat: Tensor<B, 3>,
        time_feat: Tensor<B, 3>,
        state: LstmState<B>,
    ) -> Result<(Tensor<B, 3>, LstmState<B>)> {
        let next_lags = lagged_sequence_values(&self.layout().lags_seq, history, next_value)?;
        let rnn_input = Tensor::cat(vec![next_lags, static_feat, time_feat], 2);
        Ok(self.lstm.forward(rnn_input, Some(state)))
    }

    /// Embedded categoricals, static reals and the log scale.
    fn static_features(
        &self,
        feat_static_cat: Tensor<B, 2, Int>,
        feat_static_real: Tensor<B, 2>,
        scale: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let mut parts = Vec::with_capacity(3);
        if let Some(embedded) = self.embedder.forward(feat_static_cat) {
            parts.push(embedded);
        }
        if self.layout().num_feat_static_real > 0 {
            parts.push(feat_static_real);
        }
        parts.push(scale.log());
        Tensor::cat(parts, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::deepar::DeepArConfig;
    use burn_ndarray::{NdArray, NdArrayDevice};

    fn rnn(device: &NdArrayDevice) -> LaggedRnn<NdArray> {
        let layout = DeepArConfig::new("1H", 6, 3)
            .with_num_feat_static_real(2)
            .with_num_feat_static_cat(1)
            .with_cardinality(vec![4])
            .with_lags_seq(vec![1, 2, 5])
            .layout()
            .unwrap();
        LaggedRnn::new(layout, 8, 2, 0.1, true, device)
    }

    fn inputs(rnn: &LaggedRnn<NdArray>, batch_size: usize, device: &NdArrayDevice) -> RnnInputs<NdArray> {
        let layout = rnn.layout();
        RnnInputs {
            feat_static_cat: Tensor::zeros([batch_size, 1], device),
            feat_static_real: Tensor::ones([batch_size, 2], device),
            past_time_feat: Tensor::zeros([batch_size, layout.past_length, layout.num_time_feat], device),
            past_target: Tensor::ones([batch_size, layout.past_length], device),
            past_observed_values: Tensor::ones([batch_size, layout.past_length], device),
            future_time_feat: Tensor::zeros(
                [batch_size, layout.prediction_length, layout.num_time_feat],
                device,
            ),
        }
    }

    #[test]
    fn test_unroll_shapes() {
        let device = NdArrayDevice::default();
        let rnn = rnn(&device);
        let inputs = inputs(&rnn, 3, &device);

        rnn.validate(&inputs).unwrap();
        let unrolled = rnn.unroll(&inputs).unwrap();

        assert_eq!(unrolled.output.dims(), [3, 6, 8]);
        assert_eq!(unrolled.scale.dims(), [3, 1]);
        // embedding (2) + static reals (2) + log scale (1)
        assert_eq!(unrolled.static_feat.dims(), [3, 5]);
        assert_eq!(unrolled.state.hidden.len(), 2);
    }

    #[test]
    fn test_step_shapes() {
        let device = NdArrayDevice::default();
        let rnn = rnn(&device);
        let inputs = inputs(&rnn, 2, &device);
        let unrolled = rnn.unroll(&inputs).unwrap();

        let (output, state) = rnn
            .step(
                inputs.past_target.clone(),
                Tensor::ones([2, 1], &device),
                unrolled.static_feat.unsqueeze_dim::<3>(1),
                inputs.future_time_feat.narrow(1, 1, 1),
                unrolled.state,
            )
            .unwrap();

        assert_eq!(output.dims(), [2, 1, 8]);
        assert_eq!(state.cell[0].dims(), [2, 8]);
    }

    #[test]
    fn test_validate_rejects_short_history() {
        let device = NdArrayDevice::default();
        let rnn = rnn(&device);
        let mut inputs = inputs(&rnn, 2, &device);
        inputs.past_target = Tensor::ones([2, 3], &device);

        assert!(matches!(
            rnn.validate(&inputs),
            Err(ModuleError::InputShape { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_batch() {
        let device = NdArrayDevice::default();
        let rnn = rnn(&device);
        let inputs = inputs(&rnn, 0, &device);

        assert_eq!(rnn.validate(&inputs).unwrap_err(), ModuleError::EmptyBatch);
    }

    #[test]
    fn test_declared_inputs() {
        let device = NdArrayDevice::default();
        let rnn = rnn(&device);
        let shapes = rnn.input_shapes(4);

        let names: Vec<&str> = shapes.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "feat_static_cat",
                "feat_static_real",
                "past_time_feat",
                "past_target",
                "past_observed_values",
                "future_time_feat"
            ]
        );
        assert_eq!(rnn.input_types()["feat_static_cat"], DType::I64);
        assert_eq!(rnn.input_types()["past_target"], DType::F32);
    }
}
