// External imports
use burn::tensor::{backend::Backend, Int, Tensor};
use log::debug;

// Internal imports
use crate::error::{ModuleError, Result};
use crate::model::ForecastModule;
use crate::util::tensor_tree::DynTensor;

/// Named module inputs in positional order.
#[derive(Debug, Clone)]
pub struct Batch<B: Backend> {
    entries: Vec<(String, DynTensor<B>)>,
}

impl<B: Backend> Default for Batch<B> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<B: Backend> Batch<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input; a later entry with the same name shadows an earlier one.
    pub fn with(mut self, name: &str, tensor: impl Into<DynTensor<B>>) -> Self {
        self.push(name, tensor);
        self
    }

    pub fn push(&mut self, name: &str, tensor: impl Into<DynTensor<B>>) {
        self.entries.retain(|(existing, _)| existing != name);
        self.entries.push((name.to_string(), tensor.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&DynTensor<B>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, tensor)| tensor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynTensor<B>)> {
        self.entries.iter().map(|(name, tensor)| (name.as_str(), tensor))
    }

    fn require(&self, name: &str) -> Result<&DynTensor<B>> {
        self.get(name).ok_or_else(|| ModuleError::MissingInput {
            name: name.to_string(),
        })
    }

    /// Fetch a rank-2 float input.
    pub fn float2(&self, name: &str) -> Result<Tensor<B, 2>> {
        match self.require(name)? {
            DynTensor::Float2(tensor) => Ok(tensor.clone()),
            other => Err(kind_or_rank_error(name, other, true, 2)),
        }
    }

    /// Fetch a rank-3 float input.
    pub fn float3(&self, name: &str) -> Result<Tensor<B, 3>> {
        match self.require(name)? {
            DynTensor::Float3(tensor) => Ok(tensor.clone()),
            other => Err(kind_or_rank_error(name, other, true, 3)),
        }
    }

    /// Fetch a rank-2 int input.
    pub fn int2(&self, name: &str) -> Result<Tensor<B, 2, Int>> {
        match self.require(name)? {
            DynTensor::Int2(tensor) => Ok(tensor.clone()),
            other => Err(kind_or_rank_error(name, other, false, 2)),
        }
    }
}

fn kind_or_rank_error<B: Backend>(
    name: &str,
    tensor: &DynTensor<B>,
    want_float: bool,
    want_rank: usize,
) -> ModuleError {
    if tensor.is_float() != want_float {
        ModuleError::InputKind {
            name: name.to_string(),
            expected: if want_float { "float" } else { "int" },
        }
    } else {
        ModuleError::InputRank {
            name: name.to_string(),
            expected: want_rank,
            actual: tensor.rank(),
        }
    }
}

/// Build a zero-filled batch from a module's declared input shapes and dtypes.
///
/// # Arguments
///
/// * `module` - Module whose `input_shapes` and `input_types` drive the batch
/// * `batch_size` - Number of series in the batch
/// * `device` - Device to place tensors on
///
/// # Returns
///
/// Returns the inputs in the module's positional order
pub fn construct_batch<B: Backend, M: ForecastModule<B> + ?Sized>(
    module: &M,
    batch_size: usize,
    device: &B::Device,
) -> Result<Batch<B>> {
    let types = module.input_types();
    let mut batch = Batch::new();

    for (name, shape) in module.input_shapes(batch_size) {
        let dtype = types
            .get(name)
            .copied()
            .ok_or_else(|| ModuleError::MissingInputType {
                name: name.to_string(),
            })?;
        debug!("Zero input '{}' with shape {:?} and dtype {:?}", name, shape, dtype);
        batch.push(name, DynTensor::zeros(name, &shape, dtype, device)?);
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputShapes, InputTypes};
    use crate::util::tensor_tree::{float_dtype, int_dtype, TensorTree};
    use burn::tensor::DType;
    use burn_ndarray::{NdArray, NdArrayDevice};

    /// Minimal module echoing its first input back.
    struct EchoModule {
        declare_all_types: bool,
    }

    impl ForecastModule<NdArray> for EchoModule {
        fn input_shapes(&self, batch_size: usize) -> InputShapes {
            vec![
                ("values", vec![batch_size, 5]),
                ("ids", vec![batch_size, 2]),
                ("series", vec![batch_size, 3, 4]),
            ]
        }

        fn input_types(&self) -> InputTypes {
            let mut types = InputTypes::new();
            types.insert("values", float_dtype::<NdArray>());
            types.insert("series", float_dtype::<NdArray>());
            if self.declare_all_types {
                types.insert("ids", int_dtype::<NdArray>());
            }
            types
        }

        fn forward_batch(&self, batch: Batch<NdArray>) -> Result<TensorTree<NdArray>> {
            Ok(TensorTree::leaf(batch.float2("values")?))
        }
    }

    #[test]
    fn test_construct_batch_follows_declared_order() {
        let device = NdArrayDevice::default();
        let module = EchoModule {
            declare_all_types: true,
        };

        let batch = construct_batch(&module, 3, &device).unwrap();

        assert_eq!(batch.names(), vec!["values", "ids", "series"]);
        assert_eq!(batch.get("values").unwrap().shape(), vec![3, 5]);
        assert_eq!(batch.get("ids").unwrap().dtype(), DType::I64);
        assert_eq!(batch.get("series").unwrap().shape(), vec![3, 3, 4]);
    }

    #[test]
    fn test_construct_batch_is_zero_filled() {
        let device = NdArrayDevice::default();
        let module = EchoModule {
            declare_all_types: true,
        };

        let batch = construct_batch(&module, 2, &device).unwrap();
        let total: f32 = batch.float3("series").unwrap().abs().sum().into_scalar();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_construct_batch_requires_every_type() {
        let device = NdArrayDevice::default();
        let module = EchoModule {
            declare_all_types: false,
        };

        let err = construct_batch(&module, 2, &device).unwrap_err();
        assert_eq!(
            err,
            ModuleError::MissingInputType {
                name: "ids".to_string()
            }
        );
    }

    #[test]
    fn test_zero_batch_size_gives_empty_tensors() {
        let device = NdArrayDevice::default();
        let module = EchoModule {
            declare_all_types: true,
        };

        let batch = construct_batch(&module, 0, &device).unwrap();
        assert_eq!(batch.get("values").unwrap().shape(), vec![0, 5]);
    }

    #[test]
    fn test_typed_getters_validate_inputs() {
        let device = NdArrayDevice::default();
        let module = EchoModule {
            declare_all_types: true,
        };
        let batch = construct_batch(&module, 2, &device).unwrap();

        assert_eq!(
            batch.float2("ids").unwrap_err(),
            ModuleError::InputKind {
                name: "ids".to_string(),
                expected: "float"
            }
        );
        assert_eq!(
            batch.float3("values").unwrap_err(),
            ModuleError::InputRank {
                name: "values".to_string(),
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(
            batch.int2("missing").unwrap_err(),
            ModuleError::MissingInput {
                name: "missing".to_string()
            }
        );
    }

    /// Module declaring a double-precision input.
    struct DoublePrecisionModule;

    impl ForecastModule<NdArray> for DoublePrecisionModule {
        fn input_shapes(&self, batch_size: usize) -> InputShapes {
            vec![("x", vec![batch_size, 3])]
        }

        fn input_types(&self) -> InputTypes {
            InputTypes::from([("x", DType::F64)])
        }

        fn forward_batch(&self, batch: Batch<NdArray>) -> Result<TensorTree<NdArray>> {
            Ok(TensorTree::leaf(batch.float2("x")?))
        }
    }

    #[test]
    fn test_construct_batch_honours_declared_dtype() {
        let device = NdArrayDevice::default();

        let err = construct_batch(&DoublePrecisionModule, 2, &device).unwrap_err();
        assert_eq!(
            err,
            ModuleError::UnsupportedInput {
                name: "x".to_string(),
                dtype: DType::F64,
                rank: 2
            }
        );

        let batch = construct_batch(
            &EchoModule {
                declare_all_types: true,
            },
            2,
            &device,
        )
        .unwrap();
        for (_, tensor) in batch.iter() {
            assert_ne!(tensor.dtype(), DType::F64);
        }
    }

    #[test]
    fn test_push_replaces_existing_name() {
        let device = NdArrayDevice::default();
        let batch = Batch::<NdArray>::new()
            .with("x", Tensor::<NdArray, 2>::zeros([1, 2], &device))
            .with("x", Tensor::<NdArray, 3>::zeros([1, 2, 3], &device));

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.get("x").unwrap().rank(), 3);
    }
}
