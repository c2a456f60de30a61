// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor, TensorData};
use rand::Rng;
use rand_distr::Distribution;

// Internal imports
use crate::constants::DISTRIBUTION_EPS;
use crate::error::{ModuleError, Result};
use crate::nn::lstm::repeat_interleave_rows;

/// Projects network features onto Student-t parameters.
#[derive(Module, Debug)]
pub struct StudentTOutput<B: Backend> {
    in_features: usize,
    df_proj: Linear<B>,
    loc_proj: Linear<B>,
    scale_proj: Linear<B>,
}

impl<B: Backend> StudentTOutput<B> {
    pub fn new(in_features: usize, device: &B::Device) -> Self {
        Self {
            in_features,
            df_proj: LinearConfig::new(in_features, 1).init(device),
            loc_proj: LinearConfig::new(in_features, 1).init(device),
            scale_proj: LinearConfig::new(in_features, 1).init(device),
        }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Map `[batch_size, steps, in_features]` features to distribution
    /// parameters of shape `[batch_size, steps]`.
    pub fn forward(&self, x: Tensor<B, 3>) -> StudentT<B> {
        let df = self.df_proj.forward(x.clone()).squeeze::<2>(2);
        let loc = self.loc_proj.forward(x.clone()).squeeze::<2>(2);
        let scale = self.scale_proj.forward(x).squeeze::<2>(2);

        StudentT {
            df: activation::softplus(df, 1.0).add_scalar(2.0),
            loc,
            scale: activation::softplus(scale, 1.0).clamp_min(DISTRIBUTION_EPS),
        }
    }
}

/// Student-t distribution parameters, all with the same shape.
#[derive(Debug, Clone)]
pub struct StudentT<B: Backend> {
    pub df: Tensor<B, 2>,
    pub loc: Tensor<B, 2>,
    pub scale: Tensor<B, 2>,
}

impl<B: Backend> StudentT<B> {
    /// Parameters as an ordered list `[df, loc, scale]`.
    pub fn into_args(self) -> Vec<Tensor<B, 2>> {
        vec![self.df, self.loc, self.scale]
    }

    /// Keep only the last `n` steps along the time axis.
    pub fn trailing(self, n: usize) -> Self {
        let [_, steps] = self.df.dims();
        let start = steps.saturating_sub(n);
        let len = steps - start;
        Self {
            df: self.df.narrow(1, start, len),
            loc: self.loc.narrow(1, start, len),
            scale: self.scale.narrow(1, start, len),
        }
    }

    /// Repeat each row `times` times consecutively.
    pub fn repeat_interleave(self, times: usize) -> Self {
        Self {
            df: repeat_interleave_rows(self.df, times),
            loc: repeat_interleave_rows(self.loc, times),
            scale: repeat_interleave_rows(self.scale, times),
        }
    }

    /// Draw one value per element, then multiply by `target_scale` (`[batch_size, 1]`).
    pub fn sample<R: Rng>(&self, rng: &mut R, target_scale: Option<Tensor<B, 2>>) -> Result<Tensor<B, 2>> {
        let device = self.loc.device();
        let shape = self.loc.dims();

        let df = to_host(self.df.clone())?;
        let loc = to_host(self.loc.clone())?;
        let scale = to_host(self.scale.clone())?;

        let values = df
            .iter()
            .zip(loc.iter().zip(scale.iter()))
            .map(|(df, (loc, scale))| {
                let t = rand_distr::StudentT::new(*df as f64)
                    .map_err(|e| ModuleError::Sampling(format!("df {}: {}", df, e)))?
                    .sample(&mut *rng);
                Ok(loc + scale * t as f32)
            })
            .collect::<Result<Vec<f32>>>()?;

        let samples = Tensor::<B, 2>::from_data(TensorData::new(values, shape), &device);
        Ok(match target_scale {
            Some(target_scale) => samples * target_scale,
            None => samples,
        })
    }
}

/// Copy a tensor to the host as `f32` values.
pub fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| ModuleError::TensorData(format!("{:?}", e)))
}
