// External crates
use anyhow::{bail, Context, Result};
use burn::tensor::{DType, Tensor, TensorData};
use burn_ndarray::{NdArray, NdArrayDevice};
use chrono::{NaiveDate, NaiveDateTime};
use std::env;

use foxcast::features::{advance, age_feature, time_feature_matrix, time_features_from_frequency, Frequency};

use foxcast::model::deepar::{DeepArConfig, DeepArModel};
use foxcast::model::mqf2::{Mqf2Config, Mqf2MultiHorizonModel};
use foxcast::model::simple_feedforward::{SimpleFeedForwardConfig, SimpleFeedForwardModel};
use foxcast::model::ForecastModule;
use foxcast::nn::student_t::to_host;
use foxcast::util::{
    assert_shapes_and_dtypes, construct_batch, Batch, DTypeTree, DynTensor, ShapeTree, TensorTree,
};

type Backend = NdArray<f32>;

const CONTEXT_LENGTH: usize = 24;
const PREDICTION_LENGTH: usize = 12;

fn hourly_rnn_config() -> DeepArConfig {
    DeepArConfig::new("1H", CONTEXT_LENGTH, PREDICTION_LENGTH)
        .with_num_feat_dynamic_real(1)
        .with_num_feat_static_real(1)
        .with_num_feat_static_cat(1)
        .with_cardinality(vec![1])
}

/// Build a zero batch for `module`, run it and check the outputs.
fn run_module<M: ForecastModule<Backend>>(
    name: &str,
    module: &M,
    batch_size: usize,
    expected_shapes: &ShapeTree,
    expected_dtypes: &DTypeTree,
    device: &NdArrayDevice,
) -> Result<TensorTree<Backend>> {
    let batch = construct_batch(module, batch_size, device)
        .with_context(|| format!("Failed to build a batch for {}", name))?;
    for (input, tensor) in batch.iter() {
        println!("  {} input {}: {:?}", name, input, tensor.shape());
    }

    let outputs = module
        .forward_batch(batch)
        .with_context(|| format!("Forward pass of {} failed", name))?;
    assert_shapes_and_dtypes(&outputs, expected_shapes, expected_dtypes)
        .with_context(|| format!("{} outputs do not match", name))?;

    println!("{} outputs: {:?}", name, outputs.shapes());
    Ok(outputs)
}

/// Time features `[batch_size, length, age + dynamic reals + calendar]`.
///
/// Dynamic reals are left at zero.
fn time_feat_tensor(
    freq: &Frequency,
    start: &NaiveDateTime,
    age_offset: usize,
    length: usize,
    num_feat_dynamic_real: usize,
    batch_size: usize,
    device: &NdArrayDevice,
) -> Tensor<Backend, 3> {
    let features = time_features_from_frequency(freq);
    let calendar = time_feature_matrix(&features, start, freq, length);
    let age = age_feature(age_offset, length);
    let width = 1 + num_feat_dynamic_real + features.len();

    let mut values = Vec::with_capacity(length * width);
    for t in 0..length {
        values.push(age[t]);
        values.extend(std::iter::repeat(0.0).take(num_feat_dynamic_real));
        values.extend_from_slice(&calendar[t * features.len()..(t + 1) * features.len()]);
    }

    Tensor::<Backend, 3>::from_data(TensorData::new(values, [1, length, width]), device)
        .repeat_dim(0, batch_size)
}

/// Batch with a daily-seasonal target and real calendar features.
fn calendar_batch(
    model: &DeepArModel<Backend>,
    batch_size: usize,
    device: &NdArrayDevice,
) -> Result<Batch<Backend>> {
    let config = model.config();
    let layout = config.layout()?;
    let freq: Frequency = config.freq.parse()?;
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .context("Invalid start timestamp")?;
    let future_start = advance(&start, &freq, layout.past_length);

    let target: Vec<f32> = (0..layout.past_length)
        .map(|t| 10.0 + 5.0 * (2.0 * std::f32::consts::PI * t as f32 / 24.0).sin())
        .collect();
    let past_target = Tensor::<Backend, 2>::from_data(
        TensorData::new(target, [1, layout.past_length]),
        device,
    )
    .repeat_dim(0, batch_size);

    let mut batch = construct_batch(model, batch_size, device)?;
    batch.push("past_target", past_target);
    batch.push(
        "past_observed_values",
        Tensor::<Backend, 2>::ones([batch_size, layout.past_length], device),
    );
    batch.push(
        "past_time_feat",
        time_feat_tensor(
            &freq,
            &start,
            0,
            layout.past_length,
            config.num_feat_dynamic_real,
            batch_size,
            device,
        ),
    );
    batch.push(
        "future_time_feat",
        time_feat_tensor(
            &freq,
            &future_start,
            layout.past_length,
            layout.prediction_length,
            config.num_feat_dynamic_real,
            batch_size,
            device,
        ),
    );
    Ok(batch)
}

/// Mean over sample paths of the first series.
fn calendar_forecast(
    model: &DeepArModel<Backend>,
    batch_size: usize,
    device: &NdArrayDevice,
) -> Result<Vec<f32>> {
    let batch = calendar_batch(model, batch_size, device)?;
    let outputs = model
        .forward_batch(batch)
        .context("Forward pass on the calendar batch failed")?;

    let Some(DynTensor::Float3(samples)) = outputs.into_leaf() else {
        bail!("deepar should return a single rank-3 tensor");
    };
    let [_, _, prediction_length] = samples.dims();
    let mean = samples.narrow(0, 0, 1).mean_dim(1).reshape([prediction_length]);
    Ok(to_host(mean)?)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let batch_size = match args.get(1) {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("Invalid batch size '{}'", arg))?,
        None => 4,
    };
    if batch_size == 0 {
        bail!("Batch size must be at least 1");
    }
    println!("foxcast {} | batch_size: {}", foxcast::built_info::PKG_VERSION, batch_size);

    let device = NdArrayDevice::default();
    let samples = foxcast::constants::DEFAULT_NUM_PARALLEL_SAMPLES;
    let sample_shape = ShapeTree::leaf(&[batch_size, samples, PREDICTION_LENGTH]);
    let sample_dtype = DTypeTree::leaf(DType::F32);

    let deepar: DeepArModel<Backend> = DeepArModel::new(hourly_rnn_config(), &device)?;
    run_module("deepar", &deepar, batch_size, &sample_shape, &sample_dtype, &device)?;

    let mqf2: Mqf2MultiHorizonModel<Backend> =
        Mqf2MultiHorizonModel::new(Mqf2Config::new(hourly_rnn_config()), &device)?;
    run_module("mqf2", &mqf2, batch_size, &sample_shape, &sample_dtype, &device)?;

    let feedforward: SimpleFeedForwardModel<Backend> =
        SimpleFeedForwardConfig::new(CONTEXT_LENGTH, PREDICTION_LENGTH).init(&device)?;
    let horizon = ShapeTree::leaf(&[batch_size, PREDICTION_LENGTH]);
    let column = ShapeTree::leaf(&[batch_size, 1]);
    let feedforward_shapes = ShapeTree::node(vec![
        ShapeTree::node(vec![horizon.clone(), horizon.clone(), horizon]),
        column.clone(),
        column,
    ]);
    let float = DTypeTree::leaf(DType::F32);
    let feedforward_dtypes = DTypeTree::node(vec![
        DTypeTree::node(vec![float.clone(), float.clone(), float.clone()]),
        float.clone(),
        float,
    ]);
    run_module(
        "simple_feedforward",
        &feedforward,
        batch_size,
        &feedforward_shapes,
        &feedforward_dtypes,
        &device,
    )?;

    let forecast = calendar_forecast(&deepar, batch_size, &device)?;
    println!(
        "deepar mean forecast for series 0 on an hourly calendar: {:?}",
        forecast
            .iter()
            .map(|v| format!("{:.2}", v))
            .collect::<Vec<_>>()
    );

    println!("All modules produced the expected outputs.");
    Ok(())
}
