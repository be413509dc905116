//! Error types for tensor, pooling and parameter operations

use thiserror::Error;

/// Result type alias for tensor operations
pub type Result<T> = std::result::Result<T, TensorError>;

/// Errors raised by tensor, pooling and layer operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// Operand shapes don't fit the operation
    #[error("Shape error: {0}")]
    Shape(String),

    /// Two shapes can't be broadcast together
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}")]
    Broadcast { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Reshape target doesn't preserve the element count
    #[error("Cannot reshape {numel} elements into {target:?}")]
    Reshape { numel: usize, target: Vec<isize> },

    /// Index has the wrong rank or is out of bounds
    #[error("Index {index:?} out of bounds for shape {shape:?}")]
    Index { index: Vec<usize>, shape: Vec<usize> },

    /// Invalid pooling window or input
    #[error("Pooling error: {0}")]
    Pool(String),

    /// Parameter data accessed before initialization
    #[error("Parameter '{0}' has not been initialized")]
    Uninitialized(String),

    /// Invalid initializer or pooling configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reduction over an empty tensor
    #[error("Cannot reduce an empty tensor with {0}")]
    Empty(&'static str),
}

impl From<ndarray::ShapeError> for TensorError {
    fn from(err: ndarray::ShapeError) -> Self {
        TensorError::Shape(err.to_string())
    }
}

impl From<serde_json::Error> for TensorError {
    fn from(err: serde_json::Error) -> Self {
        TensorError::Config(err.to_string())
    }
}
