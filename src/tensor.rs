use std::fmt;

use log::debug;
use ndarray::{Array1, ArrayD, Axis, IxDyn, Slice};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};
use crate::random::standard_normal;
use crate::shape::{checked_numel, infer_reshape};

/// Largest element count `arange_range` will allocate.
const MAX_ELEMENTS: usize = isize::MAX as usize / std::mem::size_of::<f32>();

/// Dense row-major `f32` tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TensorRepr", try_from = "TensorRepr")]
pub struct Tensor {
    pub(crate) data: ArrayD<f32>, // Multi-dimensional array
}

/// Wire form of a tensor: its shape and flat row-major data.
#[derive(Serialize, Deserialize)]
struct TensorRepr {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl From<Tensor> for TensorRepr {
    fn from(t: Tensor) -> Self {
        TensorRepr {
            shape: t.shape().to_vec(),
            data: t.to_vec(),
        }
    }
}

impl TryFrom<TensorRepr> for Tensor {
    type Error = TensorError;

    fn try_from(repr: TensorRepr) -> Result<Self> {
        Tensor::from_vec(&repr.shape, repr.data)
    }
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Self {
        Tensor {
            data: ArrayD::<f32>::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    pub fn full(shape: &[usize], value: f32) -> Self {
        Tensor {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    pub fn scalar(value: f32) -> Self {
        Self::full(&[], value)
    }

    /// Build a tensor from row-major data. `data.len()` must equal the
    /// number of elements in `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let expected = checked_numel(shape).ok_or_else(|| {
            TensorError::Shape(format!("shape {:?} holds too many elements", shape))
        })?;
        if data.len() != expected {
            return Err(TensorError::Shape(format!(
                "{} values cannot fill shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Tensor {
            data: ArrayD::from_shape_vec(IxDyn(shape), data)?,
        })
    }

    pub fn from_array(data: ArrayD<f32>) -> Self {
        Tensor { data }
    }

    /// `[0, 1, ..., n - 1]` as a 1D tensor.
    pub fn arange(n: usize) -> Self {
        Tensor {
            data: ArrayD::from_shape_fn(IxDyn(&[n]), |ix| ix[0] as f32),
        }
    }

    /// Values from `start` towards `stop` (exclusive) in increments of `step`.
    pub fn arange_range(start: f32, stop: f32, step: f32) -> Result<Self> {
        if step == 0.0 || !step.is_finite() {
            return Err(TensorError::Config(format!("invalid arange step {step}")));
        }
        if !start.is_finite() || !stop.is_finite() {
            return Err(TensorError::Config(format!(
                "arange bounds must be finite: [{start}, {stop})"
            )));
        }
        let count = ((stop as f64 - start as f64) / step as f64).ceil().max(0.0);
        if count > MAX_ELEMENTS as f64 {
            return Err(TensorError::Config(format!(
                "arange [{start}, {stop}) with step {step} has too many elements"
            )));
        }
        let n = count as usize;
        let data = (0..n).map(|i| start + i as f32 * step).collect();
        Self::from_vec(&[n], data)
    }

    /// Uniform samples in `[low, high)`.
    pub fn rand_uniform<R: Rng + ?Sized>(
        shape: &[usize],
        low: f32,
        high: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() || !(high - low).is_finite() {
            return Err(TensorError::Config(format!(
                "uniform bounds must be finite: [{low}, {high})"
            )));
        }
        if low > high {
            return Err(TensorError::Config(format!(
                "uniform bounds out of order: [{low}, {high})"
            )));
        }
        if low == high {
            return Ok(Self::full(shape, low));
        }
        Ok(Tensor {
            data: ArrayD::from_shape_simple_fn(IxDyn(shape), || rng.gen_range(low..high)),
        })
    }

    /// Normal samples with the given mean and standard deviation.
    pub fn randn<R: Rng + ?Sized>(
        shape: &[usize],
        mean: f32,
        std: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if !(std >= 0.0) || !std.is_finite() {
            return Err(TensorError::Config(format!("invalid standard deviation {std}")));
        }
        Ok(Tensor {
            data: ArrayD::from_shape_simple_fn(IxDyn(shape), || {
                mean + std * standard_normal(&mut *rng)
            }),
        })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Elements in row-major order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub fn as_array(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }

    /// The single value of a one-element tensor.
    pub fn item(&self) -> Result<f32> {
        match self.data.iter().next() {
            Some(&v) if self.numel() == 1 => Ok(v),
            _ => Err(TensorError::Shape(format!(
                "item() needs exactly one element, shape is {:?}",
                self.shape()
            ))),
        }
    }

    /// Reshape keeping element count and row-major order. One dimension may
    /// be `-1` and is inferred.
    pub fn reshape(&self, shape: &[isize]) -> Result<Tensor> {
        let dims = infer_reshape(self.numel(), shape)?;
        debug!("reshape {:?} -> {:?}", self.shape(), dims);
        Ok(Tensor {
            data: ArrayD::from_shape_vec(IxDyn(&dims), self.to_vec())?,
        })
    }

    pub fn flatten(&self) -> Tensor {
        Tensor {
            data: Array1::from_iter(self.data.iter().copied()).into_dyn(),
        }
    }

    /// Reverse the order of the axes.
    pub fn transpose(&self) -> Tensor {
        Tensor {
            data: self.data.t().as_standard_layout().into_owned(),
        }
    }

    pub fn t(&self) -> Tensor {
        self.transpose()
    }

    fn check_index(&self, index: &[usize]) -> Result<()> {
        let in_bounds = index.len() == self.ndim()
            && index.iter().zip(self.shape()).all(|(&i, &d)| i < d);
        if in_bounds {
            Ok(())
        } else {
            Err(TensorError::Index {
                index: index.to_vec(),
                shape: self.shape().to_vec(),
            })
        }
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis < self.ndim() {
            Ok(())
        } else {
            Err(TensorError::Shape(format!(
                "axis {axis} out of range for {}-d tensor",
                self.ndim()
            )))
        }
    }

    pub fn get(&self, index: &[usize]) -> Result<f32> {
        self.check_index(index)?;
        Ok(self.data[IxDyn(index)])
    }

    pub fn set(&mut self, index: &[usize], value: f32) -> Result<()> {
        self.check_index(index)?;
        self.data[IxDyn(index)] = value;
        Ok(())
    }

    fn axis_range(&self, axis: usize, start: usize, end: usize) -> Result<(usize, usize)> {
        self.check_axis(axis)?;
        let len = self.shape()[axis];
        let end = end.min(len);
        if start > end {
            return Err(TensorError::Index {
                index: vec![start],
                shape: self.shape().to_vec(),
            });
        }
        Ok((start, end))
    }

    /// Half-open slice `start..end` along `axis`; `end` is clamped to the
    /// axis length.
    pub fn slice_axis(&self, axis: usize, start: usize, end: usize) -> Result<Tensor> {
        let (start, end) = self.axis_range(axis, start, end)?;
        Ok(Tensor {
            data: self
                .data
                .slice_axis(Axis(axis), Slice::from(start..end))
                .to_owned(),
        })
    }

    /// Assign `value` to every element of `start..end` along `axis`.
    pub fn fill_slice_axis(&mut self, axis: usize, start: usize, end: usize, value: f32) -> Result<()> {
        let (start, end) = self.axis_range(axis, start, end)?;
        self.data
            .slice_axis_mut(Axis(axis), Slice::from(start..end))
            .fill(value);
        Ok(())
    }

    /// The `i`-th sub-tensor along the first axis.
    pub fn row(&self, i: usize) -> Result<Tensor> {
        self.check_axis(0)?;
        if i >= self.shape()[0] {
            return Err(TensorError::Index {
                index: vec![i],
                shape: self.shape().to_vec(),
            });
        }
        Ok(Tensor {
            data: self.data.index_axis(Axis(0), i).to_owned(),
        })
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn map_inplace<F: Fn(f32) -> f32>(&mut self, f: F) {
        self.data.mapv_inplace(f);
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}
