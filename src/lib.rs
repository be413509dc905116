//! Small CPU tensor library over `ndarray`: construction, reshape,
//! broadcasting arithmetic, 2D pooling, parameter initializers and a few
//! layers that own weight and bias tensors.
//!
//! ```
//! use aten_lite::prelude::*;
//!
//! let a = Tensor::arange(3).reshape(&[3, 1]).unwrap();
//! let b = Tensor::arange(2).reshape(&[1, 2]).unwrap();
//! assert_eq!(a.add(&b).unwrap().shape(), &[3, 2]);
//!
//! let x = Tensor::arange(9).reshape(&[3, 3]).unwrap();
//! let y = pool2d_reference(&x, (2, 2), PoolMode::Max).unwrap();
//! assert_eq!(y.to_vec(), vec![4.0, 5.0, 7.0, 8.0]);
//! ```

mod add;
pub mod error;
pub mod init;
pub mod layer;
mod linalg;
mod operation;
mod par_add;
pub mod parameter;
pub mod pooling;
mod random;
pub mod shape;
pub mod tensor;

pub use error::{Result, TensorError};
pub use init::{Constant, Custom, InitConfig, Initializer, Normal, Ones, Uniform, Xavier, Zeros};
pub use layer::{Activation, Block, Dense, Pool2d, Sequential};
pub use parameter::{ParamRef, Parameter, ParameterDict};
pub use pooling::{avg_pool2d, max_pool2d, pool2d, pool2d_reference, Pool2dParams, PoolMode};
pub use tensor::Tensor;

pub mod prelude {
    pub use crate::error::{Result, TensorError};
    pub use crate::init::{Constant, Custom, InitConfig, Initializer, Normal, Uniform, Xavier};
    pub use crate::layer::{Activation, Block, Dense, Pool2d, Sequential};
    pub use crate::pooling::{pool2d, pool2d_reference, Pool2dParams, PoolMode};
    pub use crate::tensor::Tensor;
}
