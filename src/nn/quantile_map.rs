// External imports
use burn::module::{Module, Param};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Distribution, Tensor};

// Internal imports
use crate::constants::DISTRIBUTION_EPS;

/// Multivariate quantile function conditioned on a hidden state.
///
/// The map is the gradient of a potential that is convex in `z`:
///
/// `phi(z; h) = alpha/2 |z|^2 + sum_k c_k softplus(a_k . z + b_k(h))`
///
/// so `z -> mu(h) + alpha z + sum_k c_k sigmoid(a_k . z + b_k(h)) a_k` is
/// monotone, which makes it a valid multivariate quantile function for a
/// standard normal reference distribution.
#[derive(Module, Debug)]
pub struct QuantileMap<B: Backend> {
    dimension: usize,
    units: usize,
    directions: Linear<B>,
    offsets: Linear<B>,
    location: Linear<B>,
    unit_weights: Param<Tensor<B, 1>>,
    quadratic: Param<Tensor<B, 1>>,
}

impl<B: Backend> QuantileMap<B> {
    /// Create a quantile map
    ///
    /// # Arguments
    ///
    /// * `dimension` - Output dimension, the number of jointly modelled horizons
    /// * `hidden_size` - Size of the conditioning hidden state
    /// * `units` - Number of softplus units in the potential
    /// * `device` - Device to place tensors on
    pub fn new(dimension: usize, hidden_size: usize, units: usize, device: &B::Device) -> Self {
        Self {
            dimension,
            units,
            directions: LinearConfig::new(dimension, units)
                .with_bias(false)
                .init(device),
            offsets: LinearConfig::new(hidden_size, units).init(device),
            location: LinearConfig::new(hidden_size, dimension).init(device),
            unit_weights: Param::from_tensor(Tensor::zeros([units], device)),
            quadratic: Param::from_tensor(Tensor::zeros([1], device)),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Push reference points through the map
    ///
    /// # Arguments
    ///
    /// * `z` - Reference points `[batch_size, num_samples, dimension]`
    /// * `hidden` - Conditioning state `[batch_size, hidden_size]`
    ///
    /// # Returns
    ///
    /// Quantile values with the same shape as `z`
    pub fn forward(&self, z: Tensor<B, 3>, hidden: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch_size, num_samples, dimension] = z.dims();
        let rows = batch_size * num_samples;
        let z = z.reshape([rows, dimension]);

        let offsets = self
            .offsets
            .forward(hidden.clone())
            .unsqueeze_dim::<3>(1)
            .repeat_dim(1, num_samples)
            .reshape([rows, self.units]);
        let location = self
            .location
            .forward(hidden)
            .unsqueeze_dim::<3>(1)
            .repeat_dim(1, num_samples)
            .reshape([rows, dimension]);

        let weights = activation::softplus(self.unit_weights.val(), 1.0).reshape([1, self.units]);
        let alpha = activation::softplus(self.quadratic.val(), 1.0)
            .add_scalar(DISTRIBUTION_EPS)
            .reshape([1, 1]);

        let gates = activation::sigmoid(self.directions.forward(z.clone()) + offsets) * weights;
        let gradient = gates.matmul(self.directions.weight.val().transpose());

        (location + z * alpha + gradient).reshape([batch_size, num_samples, dimension])
    }

    /// Draw `num_samples` joint samples per conditioning state: `[batch_size, num_samples, dimension]`.
    pub fn sample(&self, hidden: Tensor<B, 2>, num_samples: usize) -> Tensor<B, 3> {
        let [batch_size, _] = hidden.dims();
        let z = Tensor::random(
            [batch_size, num_samples, self.dimension],
            Distribution::Normal(0.0, 1.0),
            &hidden.device(),
        );
        self.forward(z, hidden)
    }
}
