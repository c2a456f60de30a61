// External imports
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use crate::error::{ModuleError, Result};

/// Lagged windows of a sequence, looking back into a prior history.
///
/// For every lag `l` in `indices` the window ending `l` steps before the end
/// of `sequence` is taken from the concatenation of `prior` and `sequence`.
/// A lag of zero yields `sequence` itself.
///
/// # Arguments
///
/// * `indices` - Lags to extract; none may exceed the prior length
/// * `prior` - History preceding the sequence, `[batch_size, prior_len]`
/// * `sequence` - Current values, `[batch_size, seq_len]`
///
/// # Returns
///
/// Returns a tensor of shape `[batch_size, seq_len, indices.len()]`
pub fn lagged_sequence_values<B: Backend>(
    indices: &[usize],
    prior: Tensor<B, 2>,
    sequence: Tensor<B, 2>,
) -> Result<Tensor<B, 3>> {
    let [batch_size, prior_len] = prior.dims();
    let [_, seq_len] = sequence.dims();

    if let Some(&max_lag) = indices.iter().max() {
        if max_lag > prior_len {
            return Err(ModuleError::InvalidConfig(format!(
                "lag {} reaches beyond the {} available history steps",
                max_lag, prior_len
            )));
        }
    } else {
        return Err(ModuleError::InvalidConfig("at least one lag is required".to_string()));
    }

    let full = Tensor::cat(vec![prior, sequence], 1);
    let windows = indices
        .iter()
        .map(|lag| {
            full.clone()
                .narrow(1, prior_len - lag, seq_len)
                .reshape([batch_size, seq_len, 1])
        })
        .collect::<Vec<_>>();

    Ok(Tensor::cat(windows, 2))
}
