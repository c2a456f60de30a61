// External imports
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use crate::constants::MINIMUM_SCALE;

/// Scaled data together with the location and scale that produced it.
pub struct Scaled<B: Backend> {
    pub data: Tensor<B, 2>,
    pub loc: Tensor<B, 2>,
    pub scale: Tensor<B, 2>,
}

/// Per-series scaling of a `[batch_size, time]` target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scaler {
    /// Divide by the mean absolute observed value.
    Mean { minimum_scale: f64 },
    /// Leave the data untouched.
    Nop,
}

impl Scaler {
    pub fn from_flag(scaling: bool) -> Self {
        if scaling {
            Self::Mean {
                minimum_scale: MINIMUM_SCALE,
            }
        } else {
            Self::Nop
        }
    }

    /// Scale `data` using only the positions flagged in `observed`.
    ///
    /// Location and scale have shape `[batch_size, 1]`. Series without any
    /// observation use the mean absolute value of the whole batch.
    pub fn scale<B: Backend>(&self, data: Tensor<B, 2>, observed: Tensor<B, 2>) -> Scaled<B> {
        let [batch_size, _] = data.dims();
        let device = data.device();
        let loc = Tensor::zeros([batch_size, 1], &device);

        match self {
            Self::Nop => Scaled {
                data,
                loc,
                scale: Tensor::ones([batch_size, 1], &device),
            },
            Self::Mean { minimum_scale } => {
                let ts_sum = (data.clone() * observed.clone()).abs().sum_dim(1);
                let num_observed = observed.sum_dim(1);
                let scale = ts_sum.clone() / num_observed.clone().clamp_min(1.0);

                let batch_sum = ts_sum.sum_dim(0);
                let batch_observations = num_observed.clone().sum_dim(0).clamp_min(1.0);
                let default_scale = (batch_sum / batch_observations).repeat_dim(0, batch_size);

                let scale = scale
                    .mask_where(num_observed.lower_equal_elem(0.0), default_scale)
                    .clamp_min(*minimum_scale);

                Scaled {
                    data: data / scale.clone(),
                    loc,
                    scale,
                }
            }
        }
    }
}
