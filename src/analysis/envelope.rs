//! Amplitude envelope primitives: rectification and an attack/release
//! peak follower.
//!
//! The follower is a one-pole smoother whose coefficient switches with the
//! direction of the signal:
//!
//! ```text
//! a = x > y ? attack : release
//! y = a * y + (1 - a) * x
//! ```
//!
//! Time constants are given in samples; the coefficient for a constant `t` is
//! `exp(-1 / t)`, so the output covers ~63% of a step after `t` samples.

/// Full-wave rectification: `dst[i] = |src[i]|` over the common length.
pub fn rectify(src: &[f32], dst: &mut [f32]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = s.abs();
    }
}

/// Smoothing coefficient for a time constant of `samples`.
///
/// Non-positive (or NaN) constants give an instantaneous response.
pub fn time_constant_coefficient(samples: f32) -> f32 {
    if samples > 0.0 {
        (-1.0 / samples).exp()
    } else {
        0.0
    }
}

/// Attack/release envelope follower with fixed time constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeFollower {
    attack: f32,
    release: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_samples: f32, release_samples: f32) -> Self {
        Self {
            attack: attack_samples,
            release: release_samples,
            attack_coeff: time_constant_coefficient(attack_samples),
            release_coeff: time_constant_coefficient(release_samples),
        }
    }

    pub fn attack(&self) -> f32 {
        self.attack
    }

    pub fn release(&self) -> f32 {
        self.release
    }

    /// Follow `src` into `dst`, starting from and updating `state`.
    pub fn process(&self, state: &mut f32, src: &[f32], dst: &mut [f32]) {
        let mut y = *state;
        for (d, &x) in dst.iter_mut().zip(src) {
            let a = if x > y {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            y = a * y + (1.0 - a) * x;
            *d = y;
        }
        *state = y;
    }
}
