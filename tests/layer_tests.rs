use std::rc::Rc;

use aten_lite::init::sparse_uniform;
use aten_lite::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn net() -> Sequential {
    Sequential::new()
        .add(Dense::new(8).with_activation(Activation::Relu))
        .add(Dense::new(1))
}

#[test]
fn parameter_access_by_name() {
    let net = net();
    let mut rng = StdRng::seed_from_u64(11);
    net.initialize(Rc::new(Normal::new(0.01)), &mut rng, false).unwrap();
    let x = Tensor::rand_uniform(&[2, 4], 0.0, 1.0, &mut rng).unwrap();
    let y = net.forward(&x).unwrap();
    assert_eq!(y.shape(), &[2, 1]);

    let params = net.collect_params();
    let w = params.get("1.weight").unwrap();
    assert_eq!(w.borrow().shape(), &[1, 8]);
    let b = params.get("1.bias").unwrap();
    assert_eq!(b.borrow().data().unwrap().to_vec(), vec![0.0]);
}

#[test]
fn reinitialize_with_constant() {
    let net = net();
    let mut rng = StdRng::seed_from_u64(12);
    net.initialize(Rc::new(Normal::new(0.01)), &mut rng, false).unwrap();
    net.forward(&Tensor::ones(&[1, 4])).unwrap();

    net.initialize(Rc::new(Constant(1.0)), &mut rng, true).unwrap();
    let w = net.collect_params().get("0.weight").unwrap();
    assert!(w.borrow().data().unwrap().to_vec().iter().all(|&v| v == 1.0));
}

#[test]
fn custom_initializer_from_closure() {
    let layer = Dense::with_in_units(16, 16).with_weight_init(Rc::new(sparse_uniform()));
    layer
        .initialize(Rc::new(Constant(0.0)), &mut StdRng::seed_from_u64(13), false)
        .unwrap();
    let w = layer.weight();
    let w = w.borrow();
    let values = w.data().unwrap().to_vec();
    assert!(values.iter().all(|&v| v == 0.0 || v.abs() >= 5.0));
}

#[test]
fn initializer_from_config() {
    let init = InitConfig::from_json(r#"{"kind": "xavier"}"#).unwrap().build().unwrap();
    let layer = Dense::with_in_units(10, 20);
    layer
        .initialize(Rc::from(init), &mut StdRng::seed_from_u64(14), false)
        .unwrap();
    let bound = Xavier::default().scale(&[10, 20]);
    let w = layer.weight();
    assert!(w.borrow().data().unwrap().to_vec().iter().all(|&v| v.abs() <= bound));
}

#[test]
fn conv_style_net_with_pooling() {
    let net = Sequential::new()
        .add(Pool2d::max((2, 2)))
        .add(Dense::new(3));
    net.initialize(Rc::new(Constant(1.0)), &mut StdRng::seed_from_u64(15), false)
        .unwrap();
    let x = Tensor::arange(16).reshape(&[1, 1, 4, 4]).unwrap();
    let y = net.forward(&x).unwrap();
    // pooled values 5 + 7 + 13 + 15
    assert_eq!(y.to_vec(), vec![40.0, 40.0, 40.0]);
    assert_eq!(net.collect_params().names(), vec!["1.weight", "1.bias"]);
}
