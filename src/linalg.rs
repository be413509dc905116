//! Conversions between 2D tensors and `nalgebra` matrices.

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::error::{Result, TensorError};
use crate::tensor::Tensor;

impl Tensor {
    /// Copy a 2D tensor into a dynamically sized `nalgebra` matrix.
    pub fn to_dmatrix(&self) -> Result<DMatrix<f32>> {
        match *self.shape() {
            [rows, cols] => Ok(DMatrix::from_row_slice(rows, cols, &self.to_vec())),
            _ => Err(TensorError::Shape(format!(
                "expected a 2-d tensor, got shape {:?}",
                self.shape()
            ))),
        }
    }

    pub fn from_dmatrix(m: &DMatrix<f32>) -> Tensor {
        let data = Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)]);
        Tensor::from_array(data.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout_survives() {
        let x = Tensor::arange(6).reshape(&[2, 3]).unwrap();
        let m = x.to_dmatrix().unwrap();
        assert_eq!(m[(0, 2)], 2.0);
        assert_eq!(m[(1, 0)], 3.0);
        assert_eq!(Tensor::from_dmatrix(&m), x);
    }

    #[test]
    fn product_agrees_with_matmul() {
        let a = Tensor::arange(6).reshape(&[2, 3]).unwrap();
        let b = Tensor::arange(6).reshape(&[3, 2]).unwrap();
        let via_nalgebra = a.to_dmatrix().unwrap() * b.to_dmatrix().unwrap();
        assert_eq!(Tensor::from_dmatrix(&via_nalgebra), a.matmul(&b).unwrap());
    }

    #[test]
    fn rejects_non_matrix() {
        assert!(Tensor::arange(3).to_dmatrix().is_err());
    }
}
