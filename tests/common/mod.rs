//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f32, b: f32, epsilon: f32) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// `len` samples of a sine at `freq` Hz.
pub fn sine(len: usize, freq: f32, sample_rate: f32, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
        .collect()
}

/// Silence, then a sine burst from `onset` to the end.
pub fn burst(len: usize, onset: usize, amplitude: f32) -> Vec<f32> {
    let tone = sine(len, 440.0, 8_000.0, amplitude);
    (0..len)
        .map(|i| if i >= onset { tone[i] } else { 0.0 })
        .collect()
}
