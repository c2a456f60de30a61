//! Forecasting model modules.
//!
//! Every model implements [`ForecastModule`]: it declares the shapes and
//! dtypes of its inputs so that callers can build a batch by reflection and
//! run a forward pass without knowing the model's argument list.

use std::collections::HashMap;

use burn::tensor::{backend::Backend, DType};

use crate::error::Result;
use crate::util::batch_builder::Batch;
use crate::util::tensor_tree::TensorTree;

pub mod deepar;
pub mod mqf2;
pub mod simple_feedforward;

/// Ordered input name to shape mapping; order is the positional call order.
pub type InputShapes = Vec<(&'static str, Vec<usize>)>;

/// Input name to dtype mapping.
pub type InputTypes = HashMap<&'static str, DType>;

/// A model that can be introspected for its inputs and called on a batch.
pub trait ForecastModule<B: Backend> {
    /// Shapes of every input for the given batch size.
    fn input_shapes(&self, batch_size: usize) -> InputShapes;

    /// Dtype of every input.
    fn input_types(&self) -> InputTypes;

    /// Run the forward pass on a batch of named inputs.
    fn forward_batch(&self, batch: Batch<B>) -> Result<TensorTree<B>>;
}
