use ndarray::{concatenate, ArrayView1, ArrayView2, ArrayViewD, Axis, Ix1, Ix2, IxDyn, Zip};

use crate::error::{Result, TensorError};
use crate::shape::broadcast_shapes;
use crate::tensor::Tensor;

impl Tensor {
    /// Apply `f` elementwise after broadcasting both operands to a common shape.
    fn zip_with<F: Fn(f32, f32) -> f32>(&self, other: &Tensor, f: F) -> Result<Tensor> {
        let shape = broadcast_shapes(self.shape(), other.shape())?;
        let err = || TensorError::Broadcast {
            lhs: self.shape().to_vec(),
            rhs: other.shape().to_vec(),
        };
        let lhs = self.data.broadcast(IxDyn(&shape)).ok_or_else(err)?;
        let rhs = other.data.broadcast(IxDyn(&shape)).ok_or_else(err)?;
        Ok(Tensor::from_array(
            Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| f(a, b)),
        ))
    }

    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, |a, b| a + b) // Element-wise addition
    }

    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, |a, b| a * b) // Element-wise multiplication
    }

    pub fn div(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, |a, b| a / b)
    }

    pub fn pow(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, f32::powf)
    }

    pub fn maximum(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, f32::max)
    }

    pub fn minimum(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, f32::min)
    }

    /// 1.0 where the broadcast operands are equal, 0.0 elsewhere.
    pub fn eq_elem(&self, other: &Tensor) -> Result<Tensor> {
        self.zip_with(other, |a, b| if a == b { 1.0 } else { 0.0 })
    }

    /// True when shapes match and `|a - b| <= atol + rtol * |b|` everywhere.
    pub fn allclose(&self, other: &Tensor, rtol: f32, atol: f32) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(&a, &b)| (a - b).abs() <= atol + rtol * b.abs())
    }

    /// Add `other` into `self` in place. `other` must broadcast to
    /// `self`'s shape without growing it.
    pub fn add_assign(&mut self, other: &Tensor) -> Result<()> {
        let rhs = other
            .data
            .broadcast(self.data.raw_dim())
            .ok_or_else(|| TensorError::Broadcast {
                lhs: self.shape().to_vec(),
                rhs: other.shape().to_vec(),
            })?;
        self.data.zip_mut_with(&rhs, |a, &b| *a += b);
        Ok(())
    }

    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Tensor {
        Tensor::from_array(self.data.mapv(f))
    }

    pub fn add_scalar(&self, v: f32) -> Tensor {
        self.map(|x| x + v)
    }

    pub fn mul_scalar(&self, v: f32) -> Tensor {
        self.map(|x| x * v)
    }

    pub fn powf(&self, e: f32) -> Tensor {
        self.map(|x| x.powf(e))
    }

    pub fn exp(&self) -> Tensor {
        self.map(f32::exp)
    }

    pub fn ln(&self) -> Tensor {
        self.map(f32::ln)
    }

    pub fn sqrt(&self) -> Tensor {
        self.map(f32::sqrt)
    }

    pub fn abs(&self) -> Tensor {
        self.map(f32::abs)
    }

    pub fn neg(&self) -> Tensor {
        self.map(|x| -x)
    }

    pub fn relu(&self) -> Tensor {
        self.map(|x| x.max(0.0))
    }

    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    pub fn mean(&self) -> Result<f32> {
        if self.numel() == 0 {
            return Err(TensorError::Empty("mean"));
        }
        Ok(self.sum() / self.numel() as f32)
    }

    pub fn max(&self) -> Result<f32> {
        self.data
            .iter()
            .copied()
            .reduce(f32::max)
            .ok_or(TensorError::Empty("max"))
    }

    pub fn min(&self) -> Result<f32> {
        self.data
            .iter()
            .copied()
            .reduce(f32::min)
            .ok_or(TensorError::Empty("min"))
    }

    /// Flat row-major position of the largest element. Ties keep the first.
    pub fn argmax(&self) -> Result<usize> {
        self.data
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
            .map(|(i, _)| i)
            .ok_or(TensorError::Empty("argmax"))
    }

    fn reduce_axis(&self, axis: usize, keepdims: bool, reduced: ndarray::ArrayD<f32>) -> Tensor {
        if keepdims {
            Tensor::from_array(reduced.insert_axis(Axis(axis)))
        } else {
            Tensor::from_array(reduced)
        }
    }

    fn axis_len(&self, axis: usize) -> Result<usize> {
        self.shape().get(axis).copied().ok_or_else(|| {
            TensorError::Shape(format!(
                "axis {axis} out of range for {}-d tensor",
                self.ndim()
            ))
        })
    }

    pub fn sum_axis(&self, axis: usize, keepdims: bool) -> Result<Tensor> {
        self.axis_len(axis)?;
        let reduced = self.data.sum_axis(Axis(axis));
        Ok(self.reduce_axis(axis, keepdims, reduced))
    }

    pub fn mean_axis(&self, axis: usize, keepdims: bool) -> Result<Tensor> {
        self.axis_len(axis)?;
        let reduced = self
            .data
            .mean_axis(Axis(axis))
            .ok_or(TensorError::Empty("mean_axis"))?;
        Ok(self.reduce_axis(axis, keepdims, reduced))
    }

    pub fn max_axis(&self, axis: usize) -> Result<Tensor> {
        if self.axis_len(axis)? == 0 {
            return Err(TensorError::Empty("max_axis"));
        }
        Ok(Tensor::from_array(
            self.data
                .fold_axis(Axis(axis), f32::NEG_INFINITY, |&acc, &v| acc.max(v)),
        ))
    }

    /// Join tensors along an existing axis. All other dimensions must match.
    pub fn concat(tensors: &[&Tensor], axis: usize) -> Result<Tensor> {
        let first = tensors
            .first()
            .ok_or_else(|| TensorError::Shape("concat needs at least one tensor".into()))?;
        first.axis_len(axis)?;
        for t in &tensors[1..] {
            let compatible = t.ndim() == first.ndim()
                && t
                    .shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !compatible {
                return Err(TensorError::Shape(format!(
                    "cannot concat {:?} with {:?} along axis {axis}",
                    first.shape(),
                    t.shape()
                )));
            }
        }
        let views: Vec<ArrayViewD<f32>> = tensors.iter().map(|t| t.data.view()).collect();
        Ok(Tensor::from_array(concatenate(Axis(axis), &views)?))
    }

    /// Matrix product for `[m, k] x [k, n]` and `[m, k] x [k]`.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        let a: ArrayView2<f32> = self.data.view().into_dimensionality::<Ix2>()?;
        let mismatch = || {
            TensorError::Shape(format!(
                "matmul shapes {:?} and {:?} are not aligned",
                self.shape(),
                other.shape()
            ))
        };
        match other.ndim() {
            2 => {
                let b: ArrayView2<f32> = other.data.view().into_dimensionality::<Ix2>()?;
                if a.ncols() != b.nrows() {
                    return Err(mismatch());
                }
                Ok(Tensor::from_array(a.dot(&b).into_dyn()))
            }
            1 => {
                let b: ArrayView1<f32> = other.data.view().into_dimensionality::<Ix1>()?;
                if a.ncols() != b.len() {
                    return Err(mismatch());
                }
                Ok(Tensor::from_array(a.dot(&b).into_dyn()))
            }
            _ => Err(mismatch()),
        }
    }

    /// Inner product of two equal-length vectors.
    pub fn dot(&self, other: &Tensor) -> Result<f32> {
        if self.ndim() != 1 || self.shape() != other.shape() {
            return Err(TensorError::Shape(format!(
                "dot needs two equal-length vectors, got {:?} and {:?}",
                self.shape(),
                other.shape()
            )));
        }
        Ok(self.data.iter().zip(other.data.iter()).map(|(a, b)| a * b).sum())
    }
}
