use aten_lite::prelude::*;
use aten_lite::{avg_pool2d, max_pool2d};

fn x4() -> Tensor {
    Tensor::arange(16).reshape(&[1, 1, 4, 4]).unwrap()
}

#[test]
fn reference_loop_on_3x3() {
    let x = Tensor::arange(9).reshape(&[3, 3]).unwrap();
    assert_eq!(
        pool2d_reference(&x, (2, 2), PoolMode::Max).unwrap().to_vec(),
        vec![4.0, 5.0, 7.0, 8.0]
    );
    assert_eq!(
        pool2d_reference(&x, (2, 2), PoolMode::Avg).unwrap().to_vec(),
        vec![2.0, 3.0, 5.0, 6.0]
    );
}

#[test]
fn vertical_edge_survives_max_pooling() {
    // 6x8 image with a dark vertical stripe in columns 2..6
    let mut x = Tensor::ones(&[6, 8]);
    for r in 0..6 {
        for c in 2..6 {
            x.set(&[r, c], 0.0).unwrap();
        }
    }
    let y = pool2d_reference(&x, (2, 2), PoolMode::Max).unwrap();
    assert_eq!(y.shape(), &[5, 7]);
    assert_eq!(y.row(0).unwrap().to_vec(), vec![1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn library_pooling_variants() {
    let x = x4();
    assert_eq!(max_pool2d(&x, &Pool2dParams::new((3, 3))).unwrap().to_vec(), vec![10.0]);

    let padded = Pool2dParams::new((3, 3)).with_padding((1, 1)).with_stride((2, 2));
    assert_eq!(max_pool2d(&x, &padded).unwrap().to_vec(), vec![5.0, 7.0, 13.0, 15.0]);

    let avg = avg_pool2d(&x, &Pool2dParams::new((2, 2))).unwrap();
    assert_eq!(avg.shape(), &[1, 1, 2, 2]);
    assert_eq!(avg.to_vec(), vec![2.5, 4.5, 10.5, 12.5]);
}

#[test]
fn multi_channel_keeps_channel_count() {
    let x = x4();
    let x = Tensor::concat(&[&x, &x.add_scalar(1.0)], 1).unwrap();
    let params = Pool2dParams::new((3, 3)).with_padding((1, 1)).with_stride((2, 2));
    let y = pool2d(&x, &params, PoolMode::Max).unwrap();
    assert_eq!(y.shape(), &[1, 2, 2, 2]);
    assert_eq!(y.slice_axis(1, 1, 2).unwrap().to_vec(), vec![6.0, 8.0, 14.0, 16.0]);
}

#[test]
fn batch_axis_is_independent() {
    let a = Tensor::arange(16).reshape(&[1, 1, 4, 4]).unwrap();
    let b = a.neg();
    let batch = Tensor::concat(&[&a, &b], 0).unwrap();
    let params = Pool2dParams::new((2, 2));
    let y = pool2d(&batch, &params, PoolMode::Max).unwrap();
    assert_eq!(y.row(0).unwrap(), pool2d(&a, &params, PoolMode::Max).unwrap().row(0).unwrap());
    assert_eq!(y.row(1).unwrap().to_vec(), vec![-0.0, -2.0, -8.0, -10.0]);
}
