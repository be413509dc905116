//! 2D max and average pooling.
//!
//! [`pool2d_reference`] is the plain double loop over a single matrix: unit
//! stride, no padding, output size `(h - ph + 1, w - pw + 1)`.
//! [`pool2d`] is the general operator with kernel, stride and padding that
//! pools the last two axes of a `[H, W]`, `[C, H, W]` or `[N, C, H, W]` input,
//! each channel independently.

use std::fmt;

use log::debug;
use ndarray::{s, Array2, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};
use crate::tensor::Tensor;

/// Aggregate computed over each pooling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolMode {
    Max,
    Avg,
}

impl fmt::Display for PoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolMode::Max => write!(f, "max"),
            PoolMode::Avg => write!(f, "avg"),
        }
    }
}

/// Max or mean of every `pool_size` window of a 2D tensor.
pub fn pool2d_reference(x: &Tensor, pool_size: (usize, usize), mode: PoolMode) -> Result<Tensor> {
    let (ph, pw) = pool_size;
    let x = x
        .as_array()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| TensorError::Pool(format!("expected a 2-d input, got {:?}", x.shape())))?;
    let (h, w) = x.dim();
    if ph == 0 || pw == 0 || ph > h || pw > w {
        return Err(TensorError::Pool(format!(
            "window {:?} does not fit input ({h}, {w})",
            pool_size
        )));
    }

    let mut y = Array2::<f32>::zeros((h - ph + 1, w - pw + 1));
    for ((i, j), out) in y.indexed_iter_mut() {
        let window = x.slice(s![i..i + ph, j..j + pw]);
        *out = match mode {
            PoolMode::Max => window.fold(f32::NEG_INFINITY, |m, &v| m.max(v)),
            PoolMode::Avg => window.sum() / (ph * pw) as f32,
        };
    }
    Ok(Tensor::from_array(y.into_dyn()))
}

fn default_count_include_pad() -> bool {
    true
}

/// Window geometry for [`pool2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool2dParams {
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    #[serde(default)]
    pub padding: (usize, usize),
    /// Average pooling divides by the full window, padded cells included.
    #[serde(default = "default_count_include_pad")]
    pub count_include_pad: bool,
}

impl Pool2dParams {
    /// Stride defaults to the kernel size, so windows don't overlap.
    pub fn new(kernel: (usize, usize)) -> Self {
        Self {
            kernel,
            stride: kernel,
            padding: (0, 0),
            count_include_pad: true,
        }
    }

    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: (usize, usize)) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_count_include_pad(mut self, include: bool) -> Self {
        self.count_include_pad = include;
        self
    }

    /// Output spatial size for an `(h, w)` input.
    pub fn output_size(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let (ph, pw) = self.padding;
        if kh == 0 || kw == 0 || sh == 0 || sw == 0 {
            return Err(TensorError::Pool(format!(
                "kernel {:?} and stride {:?} must be non-zero",
                self.kernel, self.stride
            )));
        }
        if h == 0 || w == 0 {
            return Err(TensorError::Pool(format!("empty spatial input ({h}, {w})")));
        }
        if ph > kh / 2 || pw > kw / 2 {
            return Err(TensorError::Pool(format!(
                "padding {:?} must be at most half of kernel {:?}",
                self.padding, self.kernel
            )));
        }
        if h + 2 * ph < kh || w + 2 * pw < kw {
            return Err(TensorError::Pool(format!(
                "kernel {:?} larger than padded input ({}, {})",
                self.kernel,
                h + 2 * ph,
                w + 2 * pw
            )));
        }
        Ok(((h + 2 * ph - kh) / sh + 1, (w + 2 * pw - kw) / sw + 1))
    }
}

/// Pool the last two axes of `x`. Leading axes (channels, batch) are kept.
pub fn pool2d(x: &Tensor, params: &Pool2dParams, mode: PoolMode) -> Result<Tensor> {
    let shape = x.shape();
    if !(2..=4).contains(&shape.len()) {
        return Err(TensorError::Pool(format!(
            "expected a 2-d, 3-d or 4-d input, got {:?}",
            shape
        )));
    }
    let (lead, spatial) = shape.split_at(shape.len() - 2);
    let (h, w) = (spatial[0], spatial[1]);
    let (oh, ow) = params.output_size(h, w)?;
    let planes: usize = lead.iter().product();

    let (kh, kw) = params.kernel;
    let (sh, sw) = params.stride;
    let (ph, pw) = params.padding;
    let input = x.to_vec();
    let mut out = Vec::with_capacity(planes * oh * ow);

    for p in 0..planes {
        let plane = &input[p * h * w..(p + 1) * h * w];
        for oi in 0..oh {
            // Window rows in padded coordinates, clipped to the real input.
            let r0 = oi * sh;
            let rows = r0.max(ph) - ph..(r0 + kh).min(h + ph) - ph;
            for oj in 0..ow {
                let c0 = oj * sw;
                let cols = c0.max(pw) - pw..(c0 + kw).min(w + pw) - pw;

                let cells = rows
                    .clone()
                    .flat_map(|r| plane[r * w + cols.start..r * w + cols.end].iter().copied());
                let v = match mode {
                    PoolMode::Max => cells.fold(f32::NEG_INFINITY, f32::max),
                    PoolMode::Avg => {
                        let sum: f32 = cells.sum();
                        let count = if params.count_include_pad {
                            kh * kw
                        } else {
                            rows.len() * cols.len()
                        };
                        sum / count as f32
                    }
                };
                out.push(v);
            }
        }
    }

    let mut out_shape = lead.to_vec();
    out_shape.extend([oh, ow]);
    debug!("{mode} pool2d {:?} -> {:?}", shape, out_shape);
    Tensor::from_vec(&out_shape, out)
}

pub fn max_pool2d(x: &Tensor, params: &Pool2dParams) -> Result<Tensor> {
    pool2d(x, params, PoolMode::Max)
}

pub fn avg_pool2d(x: &Tensor, params: &Pool2dParams) -> Result<Tensor> {
    pool2d(x, params, PoolMode::Avg)
}
