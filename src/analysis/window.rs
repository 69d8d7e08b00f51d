//! Window functions used by the smoothing kernels.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    /// Rectangular window (plain moving sum)
    Rectangular,
    /// Hann window (good general purpose)
    #[default]
    Hann,
    /// Hamming window (reduced side lobes)
    Hamming,
    /// Blackman window (very low side lobes)
    Blackman,
}

impl WindowFunction {
    /// Compute window coefficient at position i out of n samples
    pub fn coefficient(&self, i: usize, n: usize) -> f64 {
        let n_f = n as f64;
        let i_f = i as f64;

        match self {
            WindowFunction::Rectangular => 1.0,
            WindowFunction::Hann => 0.5 * (1.0 - (2.0 * PI * i_f / n_f).cos()),
            WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * i_f / n_f).cos(),
            WindowFunction::Blackman => {
                // Clamp to 0.0: the formula is exactly 0 at endpoints but
                // floating-point representation of 0.42 and 0.08 can produce -ε.
                (0.42 - 0.5 * (2.0 * PI * i_f / n_f).cos() + 0.08 * (4.0 * PI * i_f / n_f).cos())
                    .max(0.0)
            }
        }
    }

    /// The decaying (right) half of a window spanning `2 * len` samples.
    ///
    /// The first coefficient sits on the window peak, so convolving with this
    /// half gives a causal smoother that weights the newest sample most.
    pub fn right_half(&self, len: usize) -> Vec<f32> {
        let full = len * 2;
        (len..full)
            .map(|i| self.coefficient(i, full) as f32)
            .collect()
    }
}

/// Scale `coeffs` in place so they sum to one (unit DC gain).
///
/// An all-zero window is left as is.
pub fn normalize_dc_gain(coeffs: &mut [f32]) {
    let sum: f32 = coeffs.iter().sum();
    if sum > 0.0 {
        for c in coeffs.iter_mut() {
            *c /= sum;
        }
    }
}
