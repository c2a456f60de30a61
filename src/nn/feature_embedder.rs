// External imports
use burn::module::Module;
use burn::nn::{Embedding, EmbeddingConfig};
use burn::tensor::{backend::Backend, Int, Tensor};

// Internal imports
use crate::constants::MAX_EMBEDDING_DIMENSION;

/// Default embedding size for a categorical feature with `cardinality` levels.
pub fn default_embedding_dimension(cardinality: usize) -> usize {
    MAX_EMBEDDING_DIMENSION.min((cardinality + 1) / 2)
}

/// Embeds each static categorical feature and concatenates the embeddings.
#[derive(Module, Debug)]
pub struct FeatureEmbedder<B: Backend> {
    embedders: Vec<Embedding<B>>,
    output_size: usize,
}

impl<B: Backend> FeatureEmbedder<B> {
    /// Create one embedding table per categorical feature
    ///
    /// # Arguments
    ///
    /// * `cardinalities` - Number of levels of each feature
    /// * `dimensions` - Embedding size of each feature
    /// * `device` - Device to place tensors on
    pub fn new(cardinalities: &[usize], dimensions: &[usize], device: &B::Device) -> Self {
        let embedders = cardinalities
            .iter()
            .zip(dimensions)
            .map(|(cardinality, dimension)| {
                EmbeddingConfig::new(*cardinality, *dimension).init(device)
            })
            .collect();

        Self {
            embedders,
            output_size: dimensions.iter().sum(),
        }
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Forward pass
    ///
    /// `features` has shape `[batch_size, num_features]`; the result has shape
    /// `[batch_size, output_size]`, or `None` when there is nothing to embed.
    pub fn forward(&self, features: Tensor<B, 2, Int>) -> Option<Tensor<B, 2>> {
        if self.embedders.is_empty() || self.output_size == 0 {
            return None;
        }
        let batch_size = features.dims()[0];

        let embedded = self
            .embedders
            .iter()
            .enumerate()
            .map(|(index, embedder)| {
                let embedded = embedder.forward(features.clone().narrow(1, index, 1));
                let [_, _, dimension] = embedded.dims();
                embedded.reshape([batch_size, dimension])
            })
            .collect::<Vec<_>>();

        Some(Tensor::cat(embedded, 1))
    }
}
