//! ExtractorNode: amplitude envelope of the input signal.
//!
//! Each block goes through three stages:
//! 1. Full-wave rectification.
//! 2. Fast convolution with the decaying half of a window (Hann by default)
//!    normalised to unit DC gain.
//! 3. An attack/release peak follower.
//!
//! The convolution runs over a working buffer of
//! `next_power_of_two(data_len + window_len)` samples so the FFT never wraps
//! the tail back onto the block. Only the first `data_len` samples are ever
//! published, so children see an output of exactly `data_len` samples.
//!
//! The padding stays private to the convolver instead of widening the node's
//! input: the parent's `data_len` output must copy into the input with an
//! exact length match, so `working_len()` is never the input length.

use crate::analysis::{normalize_dc_gain, rectify, EnvelopeFollower, FastConvolver};
use crate::config::ExtractorSettings;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::node::{Processor, TransformContext};

/// Longest accepted analysis window. Longer requests are clamped.
pub const MAX_WINDOW_LENGTH: usize = 8192;

pub struct ExtractorNode {
    settings: ExtractorSettings,
    requested_window_len: usize,
    data_len: usize,
    convolver: FastConvolver,
    follower: EnvelopeFollower,
    rectified: Vec<f32>,
    smoothed: Vec<f32>,
}

impl ExtractorNode {
    /// Extractor with default follower time constants.
    pub fn new(window_len: usize, data_len: usize) -> Self {
        let settings = ExtractorSettings {
            window_length: window_len,
            ..ExtractorSettings::default()
        };
        Self::from_settings(&settings, data_len)
    }

    pub fn from_settings(settings: &ExtractorSettings, data_len: usize) -> Self {
        let requested_window_len = settings.window_length;
        let window_len = requested_window_len.clamp(1, MAX_WINDOW_LENGTH);
        if window_len != requested_window_len {
            tracing::debug!(
                "Supplied window length of {} is outside 1..={}, using {} instead",
                requested_window_len,
                MAX_WINDOW_LENGTH,
                window_len
            );
        }

        let mut kernel = settings.window.right_half(window_len);
        normalize_dc_gain(&mut kernel);

        Self {
            settings: ExtractorSettings {
                window_length: window_len,
                ..settings.clone()
            },
            requested_window_len,
            data_len,
            convolver: FastConvolver::new(&kernel, data_len),
            follower: EnvelopeFollower::new(settings.attack, settings.release),
            rectified: vec![0.0; data_len],
            smoothed: vec![0.0; data_len],
        }
    }

    /// Effective window length after clamping.
    pub fn window_len(&self) -> usize {
        self.settings.window_length
    }

    pub fn requested_window_len(&self) -> usize {
        self.requested_window_len
    }

    pub fn was_clamped(&self) -> bool {
        self.requested_window_len != self.settings.window_length
    }

    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Size of the padded working buffer used by the convolution.
    pub fn working_len(&self) -> usize {
        self.convolver.fft_len()
    }

    pub fn settings(&self) -> &ExtractorSettings {
        &self.settings
    }
}

impl Processor for ExtractorNode {
    fn name(&self) -> &str {
        "Extractor"
    }

    fn preferred_lengths(&self) -> Option<(usize, usize)> {
        Some((self.data_len, self.data_len))
    }

    fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
        let out = ctx.output.as_mut_slice();
        let n = self.data_len.min(ctx.input.len()).min(out.len());

        rectify(&ctx.input[..n], &mut self.rectified[..n]);
        self.convolver
            .process(&self.rectified[..n], &mut self.smoothed[..n]);

        // Every block starts from a settled follower so identical input gives
        // identical output.
        let mut level = 0.0;
        self.follower
            .process(&mut level, &self.smoothed[..n], &mut out[..n]);
        out[n..].fill(0.0);
        Ok(())
    }
}
