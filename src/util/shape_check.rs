// External imports
use burn::tensor::backend::Backend;

// Internal imports
use crate::error::ShapeCheckError;
use crate::util::tensor_tree::{DTypeTree, ShapeTree, TensorTree};

/// Check a module output against expected shapes and dtypes.
///
/// A leaf must match the expected shape and dtype exactly. A node is compared
/// child by child, in order, and the walk stops at the first mismatch. The
/// error carries the index path of the offending element, e.g. `[0][2]`.
///
/// # Arguments
///
/// * `tensors` - Output of a module call
/// * `shapes` - Expected shapes in the same nesting as `tensors`
/// * `dtypes` - Expected dtypes in the same nesting as `tensors`
pub fn assert_shapes_and_dtypes<B: Backend>(
    tensors: &TensorTree<B>,
    shapes: &ShapeTree,
    dtypes: &DTypeTree,
) -> Result<(), ShapeCheckError> {
    check_at(tensors, shapes, dtypes, &mut String::new())
}

fn check_at<B: Backend>(
    tensors: &TensorTree<B>,
    shapes: &ShapeTree,
    dtypes: &DTypeTree,
    path: &mut String,
) -> Result<(), ShapeCheckError> {
    match (tensors, shapes, dtypes) {
        (TensorTree::Leaf(tensor), ShapeTree::Leaf(shape), DTypeTree::Leaf(dtype)) => {
            let actual = tensor.shape();
            if &actual != shape {
                return Err(ShapeCheckError::Shape {
                    path: display_path(path),
                    expected: shape.clone(),
                    actual,
                });
            }
            if tensor.dtype() != *dtype {
                return Err(ShapeCheckError::DType {
                    path: display_path(path),
                    expected: *dtype,
                    actual: tensor.dtype(),
                });
            }
            Ok(())
        }
        (TensorTree::Node(children), ShapeTree::Node(child_shapes), DTypeTree::Node(child_dtypes)) => {
            if children.len() != child_shapes.len() {
                return Err(ShapeCheckError::Arity {
                    path: display_path(path),
                    expected: child_shapes.len(),
                    actual: children.len(),
                });
            }
            if child_dtypes.len() != child_shapes.len() {
                return Err(ShapeCheckError::Structure {
                    path: display_path(path),
                    detail: format!(
                        "{} expected shapes but {} expected dtypes",
                        child_shapes.len(),
                        child_dtypes.len()
                    ),
                });
            }

            for (index, ((child, shape), dtype)) in children
                .iter()
                .zip(child_shapes)
                .zip(child_dtypes)
                .enumerate()
            {
                let len = path.len();
                path.push_str(&format!("[{}]", index));
                check_at(child, shape, dtype, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        (tensors, shapes, dtypes) => Err(ShapeCheckError::Structure {
            path: display_path(path),
            detail: format!(
                "output is a {}, expected shape is a {}, expected dtype is a {}",
                tensor_kind(tensors),
                shape_kind(shapes),
                dtype_kind(dtypes)
            ),
        }),
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

fn tensor_kind<B: Backend>(tree: &TensorTree<B>) -> &'static str {
    match tree {
        TensorTree::Leaf(_) => "tensor",
        TensorTree::Node(_) => "sequence",
    }
}

fn shape_kind(tree: &ShapeTree) -> &'static str {
    match tree {
        ShapeTree::Leaf(_) => "tensor",
        ShapeTree::Node(_) => "sequence",
    }
}

fn dtype_kind(tree: &DTypeTree) -> &'static str {
    match tree {
        DTypeTree::Leaf(_) => "tensor",
        DTypeTree::Node(_) => "sequence",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{DType, Int, Tensor};
    use burn_ndarray::{NdArray, NdArrayDevice};

    fn nested_output(device: &NdArrayDevice) -> TensorTree<NdArray> {
        TensorTree::node(vec![
            TensorTree::node(vec![
                TensorTree::leaf(Tensor::<NdArray, 2>::zeros([4, 12], device)),
                TensorTree::leaf(Tensor::<NdArray, 2>::zeros([4, 12], device)),
            ]),
            TensorTree::leaf(Tensor::<NdArray, 2, Int>::zeros([4, 1], device)),
        ])
    }

    #[test]
    fn test_matching_nested_structure_passes() {
        let device = NdArrayDevice::default();
        let output = nested_output(&device);

        let shapes = ShapeTree::node(vec![
            ShapeTree::node(vec![ShapeTree::leaf(&[4, 12]), ShapeTree::leaf(&[4, 12])]),
            ShapeTree::leaf(&[4, 1]),
        ]);
        let dtypes = DTypeTree::node(vec![
            DTypeTree::node(vec![DTypeTree::leaf(DType::F32), DTypeTree::leaf(DType::F32)]),
            DTypeTree::leaf(DType::I64),
        ]);

        assert!(assert_shapes_and_dtypes(&output, &shapes, &dtypes).is_ok());
    }

    #[test]
    fn test_shape_mismatch_reports_path() {
        let device = NdArrayDevice::default();
        let output = nested_output(&device);

        let shapes = ShapeTree::node(vec![
            ShapeTree::node(vec![ShapeTree::leaf(&[4, 12]), ShapeTree::leaf(&[4, 11])]),
            ShapeTree::leaf(&[4, 1]),
        ]);
        let dtypes = output.dtypes();

        let err = assert_shapes_and_dtypes(&output, &shapes, &dtypes).unwrap_err();
        assert_eq!(
            err,
            ShapeCheckError::Shape {
                path: "[0][1]".to_string(),
                expected: vec![4, 11],
                actual: vec![4, 12],
            }
        );
    }

    #[test]
    fn test_first_mismatch_wins() {
        let device = NdArrayDevice::default();
        let output = nested_output(&device);

        // Both the first inner leaf and the last leaf are wrong
        let shapes = ShapeTree::node(vec![
            ShapeTree::node(vec![ShapeTree::leaf(&[3, 12]), ShapeTree::leaf(&[4, 12])]),
            ShapeTree::leaf(&[9, 9]),
        ]);

        let err = assert_shapes_and_dtypes(&output, &shapes, &output.dtypes()).unwrap_err();
        match err {
            ShapeCheckError::Shape { path, .. } => assert_eq!(path, "[0][0]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dtype_mismatch() {
        let device = NdArrayDevice::default();
        let output = nested_output(&device);

        let dtypes = DTypeTree::node(vec![
            DTypeTree::node(vec![DTypeTree::leaf(DType::F32), DTypeTree::leaf(DType::F32)]),
            DTypeTree::leaf(DType::F32),
        ]);

        let err = assert_shapes_and_dtypes(&output, &output.shapes(), &dtypes).unwrap_err();
        assert_eq!(
            err,
            ShapeCheckError::DType {
                path: "[1]".to_string(),
                expected: DType::F32,
                actual: DType::I64,
            }
        );
    }

    #[test]
    fn test_double_precision_output_is_caught() {
        let device = NdArrayDevice::default();
        let output =
            TensorTree::<NdArray<f64>>::leaf(Tensor::<NdArray<f64>, 2>::zeros([4, 12], &device));

        let err = assert_shapes_and_dtypes(
            &output,
            &ShapeTree::leaf(&[4, 12]),
            &DTypeTree::leaf(DType::F32),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ShapeCheckError::DType {
                path: "<root>".to_string(),
                expected: DType::F32,
                actual: DType::F64,
            }
        );
    }

    #[test]
    fn test_leaf_against_sequence_is_structure_error() {
        let device = NdArrayDevice::default();
        let output = TensorTree::<NdArray>::leaf(Tensor::<NdArray, 3>::zeros([4, 100, 12], &device));

        let shapes = ShapeTree::node(vec![ShapeTree::leaf(&[4, 100, 12])]);
        let dtypes = DTypeTree::node(vec![DTypeTree::leaf(DType::F32)]);

        let err = assert_shapes_and_dtypes(&output, &shapes, &dtypes).unwrap_err();
        assert!(matches!(err, ShapeCheckError::Structure { ref path, .. } if path == "<root>"));
    }

    #[test]
    fn test_child_count_mismatch() {
        let device = NdArrayDevice::default();
        let output = nested_output(&device);

        let shapes = ShapeTree::node(vec![ShapeTree::node(vec![
            ShapeTree::leaf(&[4, 12]),
            ShapeTree::leaf(&[4, 12]),
        ])]);
        let dtypes = DTypeTree::node(vec![DTypeTree::node(vec![
            DTypeTree::leaf(DType::F32),
            DTypeTree::leaf(DType::F32),
        ])]);

        let err = assert_shapes_and_dtypes(&output, &shapes, &dtypes).unwrap_err();
        assert_eq!(
            err,
            ShapeCheckError::Arity {
                path: "<root>".to_string(),
                expected: 1,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_single_tensor_passes() {
        let device = NdArrayDevice::default();
        let output = TensorTree::<NdArray>::leaf(Tensor::<NdArray, 3>::zeros([4, 100, 12], &device));

        let result = assert_shapes_and_dtypes(
            &output,
            &ShapeTree::leaf(&[4, 100, 12]),
            &DTypeTree::leaf(DType::F32),
        );
        assert!(result.is_ok());
    }
}
