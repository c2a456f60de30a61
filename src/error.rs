use burn::tensor::DType;
use thiserror::Error;

/// Errors raised while configuring modules, building batches or running a forward pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModuleError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported frequency string '{0}'")]
    UnsupportedFrequency(String),

    #[error("no dtype declared for input '{name}'")]
    MissingInputType { name: String },

    #[error("input '{name}' with dtype {dtype:?} and rank {rank} has no tensor representation")]
    UnsupportedInput { name: String, dtype: DType, rank: usize },

    #[error("batch is missing input '{name}'")]
    MissingInput { name: String },

    #[error("input '{name}' should be a {expected} tensor")]
    InputKind { name: String, expected: &'static str },

    #[error("input '{name}' should have rank {expected}, got rank {actual}")]
    InputRank {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("input '{name}' should have shape {expected:?}, got {actual:?}")]
    InputShape {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("batch holds no series; at least one is required for a forward pass")]
    EmptyBatch,

    #[error("tensor data conversion failed: {0}")]
    TensorData(String),

    #[error("cannot sample from distribution: {0}")]
    Sampling(String),
}

/// First mismatch found while comparing module outputs to an expected contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeCheckError {
    #[error("shape mismatch at {path}: expected {expected:?}, got {actual:?}")]
    Shape {
        path: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("dtype mismatch at {path}: expected {expected:?}, got {actual:?}")]
    DType {
        path: String,
        expected: DType,
        actual: DType,
    },

    #[error("structure mismatch at {path}: {detail}")]
    Structure { path: String, detail: String },

    #[error("arity mismatch at {path}: expected {expected} children, got {actual}")]
    Arity {
        path: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, ModuleError>;
