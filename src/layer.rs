//! Layers and the sequential container.

use std::rc::Rc;

use log::debug;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};
use crate::init::{Initializer, Zeros};
use crate::parameter::{ParamRef, Parameter, ParameterDict};
use crate::pooling::{pool2d, Pool2dParams, PoolMode};
use crate::tensor::Tensor;

/// Trait for network building blocks.
pub trait Block {
    /// Forward pass: input -> output.
    fn forward(&self, x: &Tensor) -> Result<Tensor>;

    /// All parameters owned by this block and its children.
    fn collect_params(&self) -> ParameterDict;

    fn name(&self) -> &str;

    /// Initialize every parameter that has no value yet (all of them with
    /// `force_reinit`). Parameters with unknown input dimensions are
    /// initialized on the first forward pass.
    fn initialize(
        &self,
        init: Rc<dyn Initializer>,
        rng: &mut dyn RngCore,
        force_reinit: bool,
    ) -> Result<()> {
        self.collect_params().initialize(&init, rng, force_reinit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
}

impl Activation {
    pub fn apply(&self, x: Tensor) -> Tensor {
        match self {
            Activation::Identity => x,
            Activation::Relu => x.relu(),
        }
    }
}

/// Fully-connected layer: `y = act(x W^T + b)`.
///
/// `weight` is `[units, in_units]`, `bias` is `[units]`. Without an explicit
/// `in_units` the input width is taken from the first batch seen. A zero
/// dimension marks an unknown size, so `units` must be non-zero.
pub struct Dense {
    units: usize,
    activation: Activation,
    weight: ParamRef,
    bias: Option<ParamRef>,
}

impl Dense {
    pub fn new(units: usize) -> Self {
        Self::with_in_units(units, 0)
    }

    pub fn with_in_units(units: usize, in_units: usize) -> Self {
        let mut bias = Parameter::new("bias", &[units]);
        bias.set_initializer(Rc::new(Zeros));
        Dense {
            units,
            activation: Activation::Identity,
            weight: Parameter::new("weight", &[units, in_units]).into_ref(),
            bias: Some(bias.into_ref()),
        }
    }

    /// A layer that uses the same weight and bias objects as `other`.
    pub fn shared_with(other: &Dense) -> Self {
        Dense {
            units: other.units,
            activation: other.activation,
            weight: Rc::clone(&other.weight),
            bias: other.bias.as_ref().map(Rc::clone),
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn without_bias(mut self) -> Self {
        self.bias = None;
        self
    }

    pub fn with_weight_init(self, init: Rc<dyn Initializer>) -> Self {
        self.weight.borrow_mut().set_initializer(init);
        self
    }

    pub fn with_bias_init(self, init: Rc<dyn Initializer>) -> Self {
        if let Some(bias) = &self.bias {
            bias.borrow_mut().set_initializer(init);
        }
        self
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn weight(&self) -> ParamRef {
        Rc::clone(&self.weight)
    }

    pub fn bias(&self) -> Option<ParamRef> {
        self.bias.as_ref().map(Rc::clone)
    }
}

impl Block for Dense {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        if self.units == 0 {
            return Err(TensorError::Config("dense layer needs at least one unit".into()));
        }
        // Trailing axes are flattened into the feature axis.
        let x = match x.ndim() {
            0 => return Err(TensorError::Shape("dense layer needs at least a 1-d input".into())),
            1 => x.reshape(&[1, -1])?,
            _ => x.reshape(&[x.shape()[0] as isize, -1])?,
        };
        let in_units = x.shape()[1];

        let mut weight = self.weight.borrow_mut();
        if weight.has_deferred_init() {
            weight.finish_deferred_init(&[self.units, in_units])?;
        }
        let w = weight.data()?;
        if w.shape()[1] != in_units {
            return Err(TensorError::Shape(format!(
                "dense layer expects {} input features, got {}",
                w.shape()[1],
                in_units
            )));
        }

        let mut y = x.matmul(&w.t())?;
        if let Some(bias) = &self.bias {
            y = y.add(bias.borrow().data()?)?;
        }
        debug!("{} forward {:?} -> {:?}", self.name(), x.shape(), y.shape());
        Ok(self.activation.apply(y))
    }

    fn collect_params(&self) -> ParameterDict {
        let mut params = ParameterDict::new();
        params.insert("weight", Rc::clone(&self.weight));
        if let Some(bias) = &self.bias {
            params.insert("bias", Rc::clone(bias));
        }
        params
    }

    fn name(&self) -> &str {
        "dense"
    }
}

/// Pooling layer without parameters.
pub struct Pool2d {
    params: Pool2dParams,
    mode: PoolMode,
}

impl Pool2d {
    pub fn new(params: Pool2dParams, mode: PoolMode) -> Self {
        Pool2d { params, mode }
    }

    pub fn max(kernel: (usize, usize)) -> Self {
        Self::new(Pool2dParams::new(kernel), PoolMode::Max)
    }

    pub fn avg(kernel: (usize, usize)) -> Self {
        Self::new(Pool2dParams::new(kernel), PoolMode::Avg)
    }

    pub fn params(&self) -> &Pool2dParams {
        &self.params
    }

    pub fn mode(&self) -> PoolMode {
        self.mode
    }
}

impl Block for Pool2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        pool2d(x, &self.params, self.mode)
    }

    fn collect_params(&self) -> ParameterDict {
        ParameterDict::new()
    }

    fn name(&self) -> &str {
        match self.mode {
            PoolMode::Max => "max_pool2d",
            PoolMode::Avg => "avg_pool2d",
        }
    }
}

/// Blocks applied one after another.
#[derive(Default)]
pub struct Sequential {
    blocks: Vec<Box<dyn Block>>,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<B: Block + 'static>(mut self, block: B) -> Self {
        self.blocks.push(Box::new(block));
        self
    }

    pub fn push(&mut self, block: Box<dyn Block>) {
        self.blocks.push(block);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&dyn Block> {
        self.blocks.get(i).map(|b| b.as_ref())
    }
}

impl Block for Sequential {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut out = x.clone();
        for block in &self.blocks {
            out = block.forward(&out)?;
        }
        Ok(out)
    }

    /// Child parameters named `"{index}.{name}"`.
    fn collect_params(&self) -> ParameterDict {
        let mut params = ParameterDict::new();
        for (i, block) in self.blocks.iter().enumerate() {
            for (name, p) in block.collect_params().iter() {
                params.insert(format!("{i}.{name}"), Rc::clone(p));
            }
        }
        params
    }

    fn name(&self) -> &str {
        "sequential"
    }
}
