//! In-memory PCM feeder.

use super::BlockSource;
use crate::error::{BeatlineError, Result};

/// Interleaved PCM held in memory, read out block by block as mono.
///
/// Each frame is downmixed by averaging its channels. The read position is
/// counted in frames and only moves forward through [`BlockSource::fill_block`]
/// or [`PcmFeeder::seek_frame`].
#[derive(Debug, Clone)]
pub struct PcmFeeder {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    position: usize,
}

impl PcmFeeder {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(BeatlineError::Source(
                "channel count must be greater than zero".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(BeatlineError::Source(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(BeatlineError::Source(format!(
                "{} samples do not divide into frames of {} channels",
                samples.len(),
                channels
            )));
        }

        tracing::debug!(
            "PCM feeder ready: {} frames, {} ch @ {} Hz",
            samples.len() / channels as usize,
            channels,
            sample_rate
        );

        Ok(Self {
            samples,
            channels,
            sample_rate,
            position: 0,
        })
    }

    /// Single-channel feeder.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, 1, sample_rate)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved sample count over all channels.
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn total_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Current read position in frames.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_frames(&self) -> usize {
        self.total_frames() - self.position
    }

    /// Seconds of audio already delivered.
    pub fn stream_time(&self) -> f64 {
        self.position as f64 / self.sample_rate as f64
    }

    pub fn stream_length_seconds(&self) -> f64 {
        self.total_frames() as f64 / self.sample_rate as f64
    }

    /// Move the read position, clamped to the end of the stream.
    pub fn seek_frame(&mut self, frame: usize) {
        self.position = frame.min(self.total_frames());
    }

    /// Copy mono frames starting at `seconds` into `out` without moving the
    /// read position. The remainder of `out` is zeroed. Returns frames copied.
    pub fn frames_at_time(&self, seconds: f64, out: &mut [f32]) -> usize {
        let start = (seconds.max(0.0) * self.sample_rate as f64) as usize;
        self.downmix_into(start, out)
    }

    fn frame(&self, index: usize) -> f32 {
        let ch = self.channels as usize;
        let frame = &self.samples[index * ch..(index + 1) * ch];
        frame.iter().sum::<f32>() / ch as f32
    }

    fn downmix_into(&self, start: usize, out: &mut [f32]) -> usize {
        let available = self.total_frames().saturating_sub(start);
        let n = available.min(out.len());
        for (i, slot) in out[..n].iter_mut().enumerate() {
            *slot = self.frame(start + i);
        }
        out[n..].fill(0.0);
        n
    }
}

impl BlockSource for PcmFeeder {
    fn fill_block(&mut self, out: &mut [f32]) -> usize {
        let n = self.downmix_into(self.position, out);
        self.position += n;
        n
    }
}
