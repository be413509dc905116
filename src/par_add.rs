use ndarray::ArrayD;
use rayon::prelude::*;

use crate::error::{Result, TensorError};
use crate::tensor::Tensor;

impl Tensor {
    /// Elementwise addition split across the rayon pool. Operands must have
    /// the same shape.
    pub fn par_add(&self, other: &Tensor) -> Result<Tensor> {
        if self.shape() != other.shape() {
            return Err(TensorError::Shape(format!(
                "par_add needs equal shapes, got {:?} and {:?}",
                self.shape(),
                other.shape()
            )));
        }
        let lhs = self.to_vec();
        let rhs = other.to_vec();
        let result: Vec<f32> = lhs
            .par_iter()
            .zip(rhs.par_iter())
            .map(|(a, b)| a + b)
            .collect();

        Ok(Tensor::from_array(ArrayD::from_shape_vec(
            self.data.raw_dim(),
            result,
        )?))
    }

    /// Apply `f` to every element in parallel.
    pub fn par_map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        let mut out = self.clone();
        out.data.par_mapv_inplace(f);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_serial_add() {
        let a = Tensor::arange(1000).reshape(&[10, 100]).unwrap();
        let b = a.mul_scalar(2.0);
        assert_eq!(a.par_add(&b).unwrap(), a.add(&b).unwrap());
        assert!(a.par_add(&Tensor::zeros(&[100, 10])).is_err());
    }

    #[test]
    fn par_map_matches_map() {
        let a = Tensor::arange(256).reshape(&[16, 16]).unwrap();
        assert_eq!(a.par_map(|x| x * x), a.map(|x| x * x));
    }
}
