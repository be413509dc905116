//! Parameter initializers.
//!
//! An [`Initializer`] produces the initial value of a parameter from its name
//! and shape. The built-in rules cover constant, uniform, normal and Xavier
//! initialization; [`Custom`] wraps any closure.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};
use crate::tensor::Tensor;

/// Produces the initial value of a parameter.
pub trait Initializer {
    /// Build a tensor of exactly `shape` for the parameter called `name`.
    fn init(&self, name: &str, shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor>;

    /// Short human-readable form used in log messages.
    fn describe(&self) -> String;
}

impl fmt::Debug for dyn Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Every element set to the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f32);

impl Initializer for Constant {
    fn init(&self, _name: &str, shape: &[usize], _rng: &mut dyn RngCore) -> Result<Tensor> {
        Ok(Tensor::full(shape, self.0))
    }

    fn describe(&self) -> String {
        format!("Constant({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Zeros;

impl Initializer for Zeros {
    fn init(&self, _name: &str, shape: &[usize], _rng: &mut dyn RngCore) -> Result<Tensor> {
        Ok(Tensor::zeros(shape))
    }

    fn describe(&self) -> String {
        "Zeros".into()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ones;

impl Initializer for Ones {
    fn init(&self, _name: &str, shape: &[usize], _rng: &mut dyn RngCore) -> Result<Tensor> {
        Ok(Tensor::ones(shape))
    }

    fn describe(&self) -> String {
        "Ones".into()
    }
}

/// Uniform samples in `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub low: f32,
    pub high: f32,
}

impl Uniform {
    /// Symmetric range `[-scale, scale)`.
    pub fn new(scale: f32) -> Self {
        Self {
            low: -scale,
            high: scale,
        }
    }
}

impl Default for Uniform {
    fn default() -> Self {
        Self::new(0.07)
    }
}

impl Initializer for Uniform {
    fn init(&self, _name: &str, shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        Tensor::rand_uniform(shape, self.low, self.high, rng)
    }

    fn describe(&self) -> String {
        format!("Uniform[{}, {})", self.low, self.high)
    }
}

/// Normal samples with mean `mean` and standard deviation `sigma`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    pub mean: f32,
    pub sigma: f32,
}

impl Normal {
    pub fn new(sigma: f32) -> Self {
        Self { mean: 0.0, sigma }
    }
}

impl Default for Normal {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl Initializer for Normal {
    fn init(&self, _name: &str, shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        Tensor::randn(shape, self.mean, self.sigma, rng)
    }

    fn describe(&self) -> String {
        format!("Normal(mean={}, sigma={})", self.mean, self.sigma)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    #[default]
    Uniform,
    Normal,
}

/// Which fan the Xavier scale is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    #[default]
    Avg,
    In,
    Out,
}

/// `(fan_in, fan_out)` of a weight laid out as `[out, in, kernel...]`.
///
/// 1-d shapes use their only dimension for both, the scalar shape gives 1.
pub fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [out, inp, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (inp * receptive, out * receptive)
        }
    }
}

/// Xavier/Glorot initialization: samples scaled by
/// `sqrt(magnitude / factor)`, where `factor` is the chosen fan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xavier {
    pub distribution: Distribution,
    pub fan_mode: FanMode,
    pub magnitude: f32,
}

impl Default for Xavier {
    fn default() -> Self {
        Self {
            distribution: Distribution::Uniform,
            fan_mode: FanMode::Avg,
            magnitude: 3.0,
        }
    }
}

impl Xavier {
    pub fn scale(&self, shape: &[usize]) -> f32 {
        let (fan_in, fan_out) = fans(shape);
        let factor = match self.fan_mode {
            FanMode::Avg => (fan_in + fan_out) as f32 / 2.0,
            FanMode::In => fan_in as f32,
            FanMode::Out => fan_out as f32,
        };
        if factor == 0.0 {
            0.0
        } else {
            (self.magnitude / factor).sqrt()
        }
    }
}

impl Initializer for Xavier {
    fn init(&self, _name: &str, shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        let scale = self.scale(shape);
        match self.distribution {
            Distribution::Uniform => Tensor::rand_uniform(shape, -scale, scale, rng),
            Distribution::Normal => Tensor::randn(shape, 0.0, scale, rng),
        }
    }

    fn describe(&self) -> String {
        format!(
            "Xavier({:?}, {:?}, magnitude={})",
            self.distribution, self.fan_mode, self.magnitude
        )
    }
}

type InitFn = dyn Fn(&str, &[usize], &mut dyn RngCore) -> Result<Tensor>;

/// User-supplied initialization rule.
pub struct Custom {
    label: String,
    rule: Box<InitFn>,
}

impl Custom {
    pub fn new<F>(label: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&str, &[usize], &mut dyn RngCore) -> Result<Tensor> + 'static,
    {
        Self {
            label: label.into(),
            rule: Box::new(rule),
        }
    }
}

impl Initializer for Custom {
    fn init(&self, name: &str, shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        let t = (self.rule)(name, shape, rng)?;
        if t.shape() != shape {
            return Err(TensorError::Shape(format!(
                "initializer {} produced {:?} for '{}' of shape {:?}",
                self.label,
                t.shape(),
                name,
                shape
            )));
        }
        Ok(t)
    }

    fn describe(&self) -> String {
        format!("Custom({})", self.label)
    }
}

/// Uniform in `[-10, 10)`, then every entry with `|w| < 5` zeroed.
pub fn sparse_uniform() -> Custom {
    Custom::new("sparse_uniform", |_name, shape, rng| {
        let mut w = Tensor::rand_uniform(shape, -10.0, 10.0, rng)?;
        w.map_inplace(|v| if v.abs() >= 5.0 { v } else { 0.0 });
        Ok(w)
    })
}

fn default_uniform_scale() -> f32 {
    0.07
}

fn default_sigma() -> f32 {
    0.01
}

fn default_magnitude() -> f32 {
    3.0
}

/// Serializable description of a built-in initializer, e.g.
/// `{"kind": "normal", "sigma": 0.01}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InitConfig {
    Uniform {
        #[serde(default = "default_uniform_scale")]
        scale: f32,
    },
    Normal {
        #[serde(default)]
        mean: f32,
        #[serde(default = "default_sigma")]
        sigma: f32,
    },
    Constant {
        value: f32,
    },
    Zeros,
    Ones,
    Xavier {
        #[serde(default)]
        distribution: Distribution,
        #[serde(default)]
        fan_mode: FanMode,
        #[serde(default = "default_magnitude")]
        magnitude: f32,
    },
}

fn non_negative(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

impl InitConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Validate and turn the description into an initializer.
    pub fn build(&self) -> Result<Box<dyn Initializer>> {
        let invalid = |what: &str, v: f32| Err(TensorError::Config(format!("invalid {what} {v}")));
        let init: Box<dyn Initializer> = match *self {
            InitConfig::Uniform { scale } if !non_negative(scale) => {
                return invalid("uniform scale", scale)
            }
            InitConfig::Uniform { scale } => Box::new(Uniform::new(scale)),
            InitConfig::Normal { sigma, .. } if !non_negative(sigma) => return invalid("sigma", sigma),
            InitConfig::Normal { mean, sigma } => Box::new(Normal { mean, sigma }),
            InitConfig::Constant { value } => Box::new(Constant(value)),
            InitConfig::Zeros => Box::new(Zeros),
            InitConfig::Ones => Box::new(Ones),
            InitConfig::Xavier { magnitude, .. } if !non_negative(magnitude) => {
                return invalid("xavier magnitude", magnitude)
            }
            InitConfig::Xavier {
                distribution,
                fan_mode,
                magnitude,
            } => Box::new(Xavier {
                distribution,
                fan_mode,
                magnitude,
            }),
        };
        Ok(init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn constant_fills_everything() {
        let w = Constant(1.0).init("weight", &[8, 4], &mut rng()).unwrap();
        assert_eq!(w.shape(), &[8, 4]);
        assert!(w.to_vec().iter().all(|&v| v == 1.0));
        assert_eq!(Zeros.init("b", &[3], &mut rng()).unwrap().sum(), 0.0);
        assert_eq!(Ones.init("b", &[3], &mut rng()).unwrap().sum(), 3.0);
    }

    #[test]
    fn uniform_respects_bounds() {
        let w = Uniform::default().init("weight", &[256, 20], &mut rng()).unwrap();
        assert!(w.to_vec().iter().all(|&v| (-0.07..0.07).contains(&v)));
    }

    #[test]
    fn normal_sigma() {
        let w = Normal::new(0.01).init("weight", &[100, 100], &mut rng()).unwrap();
        let mean = w.mean().unwrap();
        let var = w.add_scalar(-mean).powf(2.0).mean().unwrap();
        assert!(mean.abs() < 1e-3);
        assert!((var.sqrt() - 0.01).abs() < 1e-3);
    }

    #[test]
    fn fan_computation() {
        assert_eq!(fans(&[]), (1, 1));
        assert_eq!(fans(&[5]), (5, 5));
        assert_eq!(fans(&[10, 20]), (20, 10));
        assert_eq!(fans(&[8, 3, 5, 5]), (75, 200));
    }

    #[test]
    fn xavier_scale() {
        let x = Xavier::default();
        // fan_in 20, fan_out 10: sqrt(3 / 15)
        assert!((x.scale(&[10, 20]) - 0.2f32.sqrt()).abs() < 1e-6);
        let w = x.init("weight", &[10, 20], &mut rng()).unwrap();
        let bound = x.scale(&[10, 20]);
        assert!(w.to_vec().iter().all(|&v| v.abs() <= bound));
    }

    #[test]
    fn custom_rule() {
        let w = sparse_uniform().init("weight", &[64, 64], &mut rng()).unwrap();
        assert!(w
            .to_vec()
            .iter()
            .all(|&v| v == 0.0 || (5.0..=10.0).contains(&v.abs())));
        assert!(w.to_vec().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn custom_rule_shape_checked() {
        let bad = Custom::new("bad", |_, _, _| Ok(Tensor::zeros(&[1])));
        assert!(bad.init("weight", &[2, 2], &mut rng()).is_err());
    }

    #[test]
    fn config_from_json() {
        let cfg = InitConfig::from_json(r#"{"kind": "normal"}"#).unwrap();
        assert_eq!(cfg, InitConfig::Normal { mean: 0.0, sigma: 0.01 });
        assert_eq!(cfg.build().unwrap().describe(), "Normal(mean=0, sigma=0.01)");

        let cfg = InitConfig::from_json(r#"{"kind": "constant", "value": 42}"#).unwrap();
        let w = cfg.build().unwrap().init("w", &[2], &mut rng()).unwrap();
        assert_eq!(w.to_vec(), vec![42.0, 42.0]);

        let cfg = InitConfig::from_json(r#"{"kind": "xavier", "distribution": "normal"}"#).unwrap();
        assert!(matches!(
            cfg,
            InitConfig::Xavier { distribution: Distribution::Normal, fan_mode: FanMode::Avg, .. }
        ));

        assert!(InitConfig::from_json(r#"{"kind": "orthogonal"}"#).is_err());
        assert!(InitConfig::Normal { mean: 0.0, sigma: -1.0 }.build().is_err());
    }

    #[test]
    fn config_rejects_nan_and_infinite() {
        for bad in [f32::NAN, f32::INFINITY, -1.0] {
            assert!(InitConfig::Uniform { scale: bad }.build().is_err());
            assert!(InitConfig::Normal { mean: 0.0, sigma: bad }.build().is_err());
            let xavier = InitConfig::Xavier {
                distribution: Distribution::Uniform,
                fan_mode: FanMode::Avg,
                magnitude: bad,
            };
            assert!(matches!(xavier.build(), Err(TensorError::Config(_))));
        }
        let w = InitConfig::Uniform { scale: 0.0 }.build().unwrap();
        assert_eq!(w.init("w", &[2], &mut rng()).unwrap().to_vec(), vec![0.0, 0.0]);
    }
}
