use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::{Result, TensorError};
use crate::init::Initializer;
use crate::tensor::Tensor;

/// Shared handle to a parameter. Layers that hold the same handle have tied
/// weights.
pub type ParamRef = Rc<RefCell<Parameter>>;

/// Initialization requested while the shape still had unknown dimensions.
struct DeferredInit {
    init: Rc<dyn Initializer>,
    rng: StdRng,
}

/// A named layer tensor. A dimension of 0 in `shape` means "not known yet";
/// such a parameter is initialized once the first input fixes its shape.
pub struct Parameter {
    name: String,
    shape: Vec<usize>,
    data: Option<Tensor>,
    init: Option<Rc<dyn Initializer>>,
    deferred: Option<DeferredInit>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, shape: &[usize]) -> Self {
        Parameter {
            name: name.into(),
            shape: shape.to_vec(),
            data: None,
            init: None,
            deferred: None,
        }
    }

    pub fn into_ref(self) -> ParamRef {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn shape_known(&self) -> bool {
        self.shape.iter().all(|&d| d != 0)
    }

    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    pub fn has_deferred_init(&self) -> bool {
        self.deferred.is_some()
    }

    /// Initializer that overrides the one passed to [`Parameter::initialize`].
    pub fn set_initializer(&mut self, init: Rc<dyn Initializer>) {
        self.init = Some(init);
    }

    /// Initialize with this parameter's own initializer, falling back to
    /// `default_init`. Already initialized data is kept unless `force_reinit`.
    pub fn initialize(
        &mut self,
        default_init: &Rc<dyn Initializer>,
        rng: &mut dyn RngCore,
        force_reinit: bool,
    ) -> Result<()> {
        if self.data.is_some() && !force_reinit {
            warn!(
                "Parameter '{}' is already initialized, ignoring. Set force_reinit to re-initialize",
                self.name
            );
            return Ok(());
        }
        let init = self.init.clone().unwrap_or_else(|| Rc::clone(default_init));

        if self.shape_known() {
            self.deferred = None;
            return self.init_now(init.as_ref(), rng);
        }

        info!(
            "Deferring initialization of '{}' until its shape {:?} is known",
            self.name, self.shape
        );
        let rng = StdRng::from_rng(rng).map_err(|e| TensorError::Config(e.to_string()))?;
        self.data = None;
        self.deferred = Some(DeferredInit { init, rng });
        Ok(())
    }

    fn init_now(&mut self, init: &dyn Initializer, rng: &mut dyn RngCore) -> Result<()> {
        let data = init.init(&self.name, &self.shape, rng)?;
        if data.shape() != self.shape.as_slice() {
            return Err(TensorError::Shape(format!(
                "{} produced {:?} for '{}' of shape {:?}",
                init.describe(),
                data.shape(),
                self.name,
                self.shape
            )));
        }
        info!(
            "Initialized '{}' {:?} with {}",
            self.name,
            self.shape,
            init.describe()
        );
        self.data = Some(data);
        Ok(())
    }

    /// Fill in unknown dimensions from `shape` and run any pending deferred
    /// initialization. Known dimensions must agree.
    pub fn finish_deferred_init(&mut self, shape: &[usize]) -> Result<()> {
        self.merge_shape(shape)?;
        if let Some(DeferredInit { init, mut rng }) = self.deferred.take() {
            debug!("Running deferred initialization of '{}'", self.name);
            self.init_now(init.as_ref(), &mut rng)?;
        }
        Ok(())
    }

    fn merge_shape(&mut self, shape: &[usize]) -> Result<()> {
        let compatible = shape.len() == self.shape.len()
            && self
                .shape
                .iter()
                .zip(shape)
                .all(|(&known, &given)| known == 0 || known == given);
        if !compatible {
            return Err(TensorError::Shape(format!(
                "parameter '{}' of shape {:?} cannot take shape {:?}",
                self.name, self.shape, shape
            )));
        }
        self.shape = shape.to_vec();
        Ok(())
    }

    pub fn data(&self) -> Result<&Tensor> {
        self.data
            .as_ref()
            .ok_or_else(|| TensorError::Uninitialized(self.name.clone()))
    }

    pub fn data_mut(&mut self) -> Result<&mut Tensor> {
        let name = &self.name;
        self.data
            .as_mut()
            .ok_or_else(|| TensorError::Uninitialized(name.clone()))
    }

    /// Overwrite the value directly. The tensor must fit the known dimensions.
    pub fn set_data(&mut self, data: Tensor) -> Result<()> {
        self.merge_shape(data.shape())?;
        self.deferred = None;
        self.data = Some(data);
        Ok(())
    }
}

/// Ordered name to parameter map, as collected from a block.
#[derive(Default, Clone)]
pub struct ParameterDict {
    params: Vec<(String, ParamRef)>,
}

impl ParameterDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, param: ParamRef) {
        self.params.push((name.into(), param));
    }

    pub fn get(&self, name: &str) -> Option<ParamRef> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| Rc::clone(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamRef)> {
        self.params.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Distinct parameters, tied entries counted once.
    fn unique(&self) -> Vec<&ParamRef> {
        let mut seen: Vec<&ParamRef> = Vec::new();
        for (_, p) in &self.params {
            if !seen.iter().any(|s| Rc::ptr_eq(s, p)) {
                seen.push(p);
            }
        }
        seen
    }

    /// Initialize every distinct parameter.
    pub fn initialize(
        &self,
        init: &Rc<dyn Initializer>,
        rng: &mut dyn RngCore,
        force_reinit: bool,
    ) -> Result<()> {
        for p in self.unique() {
            p.borrow_mut().initialize(init, rng, force_reinit)?;
        }
        Ok(())
    }

    /// Total number of initialized elements over distinct parameters.
    pub fn num_elements(&self) -> usize {
        self.unique()
            .iter()
            .filter_map(|p| p.borrow().data().ok().map(Tensor::numel))
            .sum()
    }
}
