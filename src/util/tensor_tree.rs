// External imports
use burn::tensor::{backend::Backend, DType, Element, Int, Tensor};

// Internal imports
use crate::error::{ModuleError, Result};

/// A tensor with its rank and kind erased, so that module inputs and outputs
/// of different ranks can live side by side in one collection.
#[derive(Debug, Clone)]
pub enum DynTensor<B: Backend> {
    Float1(Tensor<B, 1>),
    Float2(Tensor<B, 2>),
    Float3(Tensor<B, 3>),
    Int1(Tensor<B, 1, Int>),
    Int2(Tensor<B, 2, Int>),
}

/// Element dtype used by the backend for float tensors.
pub fn float_dtype<B: Backend>() -> DType {
    <B::FloatElem as Element>::dtype()
}

/// Element dtype used by the backend for int tensors.
pub fn int_dtype<B: Backend>() -> DType {
    <B::IntElem as Element>::dtype()
}

impl<B: Backend> DynTensor<B> {
    /// Create a zero-filled tensor of the given shape and dtype.
    ///
    /// The dtype must be the backend's float or int element type; tensors are
    /// never silently created with another precision. `name` is only used to
    /// report unsupported dtype/rank combinations.
    pub fn zeros(name: &str, shape: &[usize], dtype: DType, device: &B::Device) -> Result<Self> {
        let is_float = dtype == float_dtype::<B>();
        let is_int = dtype == int_dtype::<B>();
        let tensor = match (shape, is_float, is_int) {
            ([d0], true, _) => Self::Float1(Tensor::zeros([*d0], device)),
            ([d0, d1], true, _) => Self::Float2(Tensor::zeros([*d0, *d1], device)),
            ([d0, d1, d2], true, _) => Self::Float3(Tensor::zeros([*d0, *d1, *d2], device)),
            ([d0], _, true) => Self::Int1(Tensor::zeros([*d0], device)),
            ([d0, d1], _, true) => Self::Int2(Tensor::zeros([*d0, *d1], device)),
            _ => {
                return Err(ModuleError::UnsupportedInput {
                    name: name.to_string(),
                    dtype,
                    rank: shape.len(),
                })
            }
        };
        Ok(tensor)
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Float1(t) => t.dims().to_vec(),
            Self::Float2(t) => t.dims().to_vec(),
            Self::Float3(t) => t.dims().to_vec(),
            Self::Int1(t) => t.dims().to_vec(),
            Self::Int2(t) => t.dims().to_vec(),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Self::Float1(_) | Self::Int1(_) => 1,
            Self::Float2(_) | Self::Int2(_) => 2,
            Self::Float3(_) => 3,
        }
    }

    /// Element dtype of the stored tensor.
    pub fn dtype(&self) -> DType {
        match self {
            Self::Float1(t) => t.dtype(),
            Self::Float2(t) => t.dtype(),
            Self::Float3(t) => t.dtype(),
            Self::Int1(t) => t.dtype(),
            Self::Int2(t) => t.dtype(),
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float1(_) | Self::Float2(_) | Self::Float3(_))
    }
}

impl<B: Backend> From<Tensor<B, 1>> for DynTensor<B> {
    fn from(tensor: Tensor<B, 1>) -> Self {
        Self::Float1(tensor)
    }
}

impl<B: Backend> From<Tensor<B, 2>> for DynTensor<B> {
    fn from(tensor: Tensor<B, 2>) -> Self {
        Self::Float2(tensor)
    }
}

impl<B: Backend> From<Tensor<B, 3>> for DynTensor<B> {
    fn from(tensor: Tensor<B, 3>) -> Self {
        Self::Float3(tensor)
    }
}

impl<B: Backend> From<Tensor<B, 2, Int>> for DynTensor<B> {
    fn from(tensor: Tensor<B, 2, Int>) -> Self {
        Self::Int2(tensor)
    }
}

/// Output of a module call: a single tensor or an arbitrarily nested sequence of tensors.
#[derive(Debug, Clone)]
pub enum TensorTree<B: Backend> {
    Leaf(DynTensor<B>),
    Node(Vec<TensorTree<B>>),
}

impl<B: Backend> TensorTree<B> {
    pub fn leaf(tensor: impl Into<DynTensor<B>>) -> Self {
        Self::Leaf(tensor.into())
    }

    pub fn node(children: Vec<TensorTree<B>>) -> Self {
        Self::Node(children)
    }

    /// Shapes of every leaf, laid out in the same structure.
    pub fn shapes(&self) -> ShapeTree {
        match self {
            Self::Leaf(tensor) => ShapeTree::Leaf(tensor.shape()),
            Self::Node(children) => ShapeTree::Node(children.iter().map(Self::shapes).collect()),
        }
    }

    /// Dtypes of every leaf, laid out in the same structure.
    pub fn dtypes(&self) -> DTypeTree {
        match self {
            Self::Leaf(tensor) => DTypeTree::Leaf(tensor.dtype()),
            Self::Node(children) => DTypeTree::Node(children.iter().map(Self::dtypes).collect()),
        }
    }

    /// Take the single tensor out of a leaf.
    pub fn into_leaf(self) -> Option<DynTensor<B>> {
        match self {
            Self::Leaf(tensor) => Some(tensor),
            Self::Node(_) => None,
        }
    }
}

/// Expected shapes, parallel to a [`TensorTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeTree {
    Leaf(Vec<usize>),
    Node(Vec<ShapeTree>),
}

impl ShapeTree {
    pub fn leaf(shape: &[usize]) -> Self {
        Self::Leaf(shape.to_vec())
    }

    pub fn node(children: Vec<ShapeTree>) -> Self {
        Self::Node(children)
    }
}

/// Expected dtypes, parallel to a [`TensorTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DTypeTree {
    Leaf(DType),
    Node(Vec<DTypeTree>),
}

impl DTypeTree {
    pub fn leaf(dtype: DType) -> Self {
        Self::Leaf(dtype)
    }

    pub fn node(children: Vec<DTypeTree>) -> Self {
        Self::Node(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_zeros_picks_variant_from_dtype_and_rank() {
        let device = NdArrayDevice::default();

        let float = DynTensor::<NdArray>::zeros("x", &[4, 24], DType::F32, &device).unwrap();
        assert!(matches!(float, DynTensor::Float2(_)));
        assert_eq!(float.shape(), vec![4, 24]);
        assert_eq!(float.dtype(), DType::F32);

        let int = DynTensor::<NdArray>::zeros("c", &[4, 1], DType::I64, &device).unwrap();
        assert!(matches!(int, DynTensor::Int2(_)));
        assert_eq!(int.dtype(), DType::I64);
        assert_eq!(int.rank(), 2);
    }

    #[test]
    fn test_zeros_rejects_unsupported_rank() {
        let device = NdArrayDevice::default();
        let err = DynTensor::<NdArray>::zeros("c", &[4, 2, 3], DType::I64, &device).unwrap_err();
        assert_eq!(
            err,
            ModuleError::UnsupportedInput {
                name: "c".to_string(),
                dtype: DType::I64,
                rank: 3
            }
        );
    }

    #[test]
    fn test_zeros_rejects_non_backend_dtype() {
        let device = NdArrayDevice::default();

        let err = DynTensor::<NdArray>::zeros("x", &[2, 3], DType::F64, &device).unwrap_err();
        assert_eq!(
            err,
            ModuleError::UnsupportedInput {
                name: "x".to_string(),
                dtype: DType::F64,
                rank: 2
            }
        );
        assert!(DynTensor::<NdArray>::zeros("c", &[2, 1], DType::I32, &device).is_err());
    }

    #[test]
    fn test_dtype_is_read_from_tensor() {
        let device = NdArrayDevice::default();
        let tensor = DynTensor::<NdArray<f64>>::from(Tensor::<NdArray<f64>, 3>::zeros([1, 2, 3], &device));
        assert_eq!(tensor.dtype(), DType::F64);
    }

    #[test]
    fn test_tree_shapes_follow_structure() {
        let device = NdArrayDevice::default();
        let tree = TensorTree::<NdArray>::node(vec![
            TensorTree::node(vec![TensorTree::leaf(Tensor::<NdArray, 2>::zeros(
                [2, 3],
                &device,
            ))]),
            TensorTree::leaf(Tensor::<NdArray, 3>::zeros([2, 1, 5], &device)),
        ]);

        assert_eq!(
            tree.shapes(),
            ShapeTree::node(vec![
                ShapeTree::node(vec![ShapeTree::leaf(&[2, 3])]),
                ShapeTree::leaf(&[2, 1, 5]),
            ])
        );
        assert_eq!(
            tree.dtypes(),
            DTypeTree::node(vec![
                DTypeTree::node(vec![DTypeTree::leaf(DType::F32)]),
                DTypeTree::leaf(DType::F32),
            ])
        );
    }
}
