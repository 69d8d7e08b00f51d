//! NormalizeNode: scale each block to a unit absolute peak.

use crate::analysis::normalize_to_unit;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::node::{Processor, TransformContext};

/// Divides every block by its absolute peak so the output lies in `[-1, 1]`.
/// Silent blocks pass through unchanged.
#[derive(Debug, Default)]
pub struct NormalizeNode {
    last_peak: f32,
}

impl NormalizeNode {
    pub fn new() -> Self {
        Self { last_peak: 0.0 }
    }

    /// Absolute peak of the most recent input block.
    pub fn last_peak(&self) -> f32 {
        self.last_peak
    }
}

impl Processor for NormalizeNode {
    fn name(&self) -> &str {
        "Normalize"
    }

    fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
        let out = ctx.output.as_mut_slice();
        let n = ctx.input.len().min(out.len());
        self.last_peak = normalize_to_unit(&ctx.input[..n], &mut out[..n]);
        out[n..].fill(0.0);
        Ok(())
    }
}
