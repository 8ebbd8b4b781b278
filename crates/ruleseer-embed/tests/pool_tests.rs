use candle_core::{DType, Device, Tensor};
use ruleseer_embed::masked_mean_l2;

#[test]
fn masked_mean_l2_basic() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; second token is masked out.
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &dev).expect("hidden");
    let mask = Tensor::from_slice(&[1u32, 0u32], (1, 2), &dev).expect("mask").to_dtype(DType::F32).expect("f32");
    let out = masked_mean_l2(&h, &mask).expect("pool");
    let v: Vec<Vec<f32>> = out.to_vec2().expect("vec2");
    let norm: f32 = (1.0f32 + 4.0 + 9.0 + 16.0).sqrt();
    let expected = [1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm];
    for (a, b) in v[0].iter().copied().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn rows_pool_independently() {
    let dev = Device::Cpu;
    // Row 0 averages both tokens, row 1 only its first token.
    let h = Tensor::from_slice(
        &[1.0f32, 0.0, 3.0, 0.0, /* row 1 */ 0.0, 2.0, 9.0, 9.0],
        (2, 2, 2),
        &dev,
    )
    .expect("hidden");
    let mask = Tensor::from_slice(&[1u32, 1, 1, 0], (2, 2), &dev).expect("mask");
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).expect("pool").to_vec2().expect("vec2");
    assert!((v[0][0] - 1.0).abs() < 1e-5 && v[0][1].abs() < 1e-5, "row 0 = [1, 0], got {:?}", v[0]);
    assert!(v[1][0].abs() < 1e-5 && (v[1][1] - 1.0).abs() < 1e-5, "row 1 = [0, 1], got {:?}", v[1]);
}
