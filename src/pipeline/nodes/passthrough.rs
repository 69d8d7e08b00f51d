//! PassthroughNode: identity transform.
//!
//! Copies its input to its output. Used as the pipeline head that the driver
//! writes raw blocks into, and as a fan-out point.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::node::{Processor, TransformContext};

/// Identity node. When input and output lengths differ, the shorter prefix
/// is copied and any remaining output samples are zeroed.
#[derive(Debug, Default)]
pub struct PassthroughNode {
    length: Option<usize>,
}

impl PassthroughNode {
    pub fn new() -> Self {
        Self { length: None }
    }

    /// Passthrough that asks for `length` samples on both sides.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: Some(length),
        }
    }
}

impl Processor for PassthroughNode {
    fn name(&self) -> &str {
        "Passthrough"
    }

    fn preferred_lengths(&self) -> Option<(usize, usize)> {
        self.length.map(|n| (n, n))
    }

    fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
        let out = ctx.output.as_mut_slice();
        let n = ctx.input.len().min(out.len());
        out[..n].copy_from_slice(&ctx.input[..n]);
        out[n..].fill(0.0);
        Ok(())
    }
}
