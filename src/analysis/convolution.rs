//! FFT-based linear convolution over fixed block sizes.
//!
//! The transform length is the next power of two at or above
//! `block_len + kernel_len`, which is large enough that the circular
//! convolution computed in the frequency domain never wraps around onto the
//! samples we read back.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Convolves blocks of up to `block_len` samples with a fixed kernel.
///
/// All working memory is allocated up front; [`FastConvolver::process`] does
/// not allocate.
pub struct FastConvolver {
    block_len: usize,
    kernel_len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    kernel_spectrum: Vec<Complex<f32>>,
    work: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FastConvolver {
    pub fn new(kernel: &[f32], block_len: usize) -> Self {
        let fft_len = working_len(block_len, kernel.len());

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        let mut scratch = vec![Complex::new(0.0, 0.0); scratch_len];

        let mut kernel_spectrum = vec![Complex::new(0.0, 0.0); fft_len];
        for (dst, &k) in kernel_spectrum.iter_mut().zip(kernel) {
            *dst = Complex::new(k, 0.0);
        }
        forward.process_with_scratch(&mut kernel_spectrum, &mut scratch);

        Self {
            block_len,
            kernel_len: kernel.len(),
            forward,
            inverse,
            kernel_spectrum,
            work: vec![Complex::new(0.0, 0.0); fft_len],
            scratch,
        }
    }

    /// Length of the padded working buffer (a power of two).
    pub fn fft_len(&self) -> usize {
        self.work.len()
    }

    pub fn kernel_len(&self) -> usize {
        self.kernel_len
    }

    /// Write the first `out.len()` samples of `signal * kernel` into `out`.
    ///
    /// `signal` longer than `block_len` is truncated to it; `out` longer than
    /// the working buffer is zero-filled past the end.
    pub fn process(&mut self, signal: &[f32], out: &mut [f32]) {
        let n = signal.len().min(self.block_len);

        for (i, slot) in self.work.iter_mut().enumerate() {
            let re = if i < n { signal[i] } else { 0.0 };
            *slot = Complex::new(re, 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.work, &mut self.scratch);
        for (bin, k) in self.work.iter_mut().zip(&self.kernel_spectrum) {
            *bin *= *k;
        }
        self.inverse
            .process_with_scratch(&mut self.work, &mut self.scratch);

        // rustfft leaves the inverse unnormalised
        let scale = 1.0 / self.work.len() as f32;
        for (i, dst) in out.iter_mut().enumerate() {
            *dst = self.work.get(i).map_or(0.0, |c| c.re * scale);
        }
    }
}

/// Power-of-two working size for a block/kernel pair.
pub fn working_len(block_len: usize, kernel_len: usize) -> usize {
    (block_len + kernel_len).next_power_of_two()
}
