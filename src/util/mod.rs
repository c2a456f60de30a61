pub mod batch_builder;
pub mod model_serialization;
pub mod shape_check;
pub mod tensor_tree;

pub use batch_builder::{construct_batch, Batch};
pub use shape_check::assert_shapes_and_dtypes;
pub use tensor_tree::{DTypeTree, DynTensor, ShapeTree, TensorTree};
