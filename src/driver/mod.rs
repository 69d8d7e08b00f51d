//! Driving a pipeline from a block source.
//!
//! The pipeline never pulls data. A [`Driver`] asks its [`BlockSource`] for
//! the next block, writes it into the root's input buffer, then runs one
//! propagation cycle from that root. The root input is only touched when the
//! source produced fresh samples.

mod feeder;

pub use feeder::PcmFeeder;

use crate::pipeline::{NodeId, Pipeline, PipelineError, PipelineResult};

/// Something that can produce mono sample blocks.
pub trait BlockSource {
    /// Write up to `out.len()` samples into `out` and zero the rest.
    /// Returns the number of samples written; `0` means exhausted.
    fn fill_block(&mut self, out: &mut [f32]) -> usize;
}

/// Pushes blocks from a source through the subtree rooted at `root`.
pub struct Driver<S> {
    source: S,
    root: NodeId,
    blocks: u64,
    staging: Vec<f32>,
}

impl<S: BlockSource> Driver<S> {
    pub fn new(source: S, root: NodeId) -> Self {
        Self {
            source,
            root,
            blocks: 0,
            staging: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Blocks pushed so far.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Fill the root input and run one cycle.
    ///
    /// Returns the number of fresh samples in the block, or `None` once the
    /// source is exhausted (no cycle is run then). A partial final block is
    /// zero-padded.
    pub fn run_cycle(&mut self, pipeline: &mut Pipeline) -> PipelineResult<Option<usize>> {
        if pipeline.parent(self.root)?.is_some() {
            return Err(PipelineError::NotRoot(self.root));
        }

        let len = pipeline.input_len(self.root)?;
        if len == 0 {
            tracing::warn!("Root {} has a zero-length input; nothing to drive", self.root);
            return Ok(None);
        }

        self.staging.resize(len, 0.0);
        let written = self.source.fill_block(&mut self.staging);
        if written == 0 {
            return Ok(None);
        }

        pipeline
            .input_mut(self.root)?
            .copy_from_slice(&self.staging);
        pipeline.propagate(self.root, None)?;
        self.blocks += 1;
        Ok(Some(written))
    }

    /// Run cycles until the source is exhausted, calling `on_block` after
    /// each one. Returns the number of cycles run.
    pub fn run_to_end<F>(&mut self, pipeline: &mut Pipeline, mut on_block: F) -> PipelineResult<u64>
    where
        F: FnMut(&Pipeline, usize),
    {
        let start = self.blocks;
        while let Some(written) = self.run_cycle(pipeline)? {
            on_block(pipeline, written);
        }
        let ran = self.blocks - start;
        tracing::info!("Driver finished after {} blocks", ran);
        Ok(ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::nodes::PassthroughNode;
    use crate::pipeline::NodeSpec;

    fn chain(len: usize) -> (Pipeline, NodeId, NodeId) {
        let mut p = Pipeline::new();
        let root = p.add_root(NodeSpec::new("source", PassthroughNode::new()).length(len)).unwrap();
        let sink = p
            .add_node(NodeSpec::new("sink", PassthroughNode::new()).length(len), Some(root))
            .unwrap();
        (p, root, sink)
    }

    #[test]
    fn test_run_cycle_pushes_block() {
        let (mut p, root, sink) = chain(4);
        let feeder = PcmFeeder::mono(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 48_000).unwrap();
        let mut driver = Driver::new(feeder, root);

        assert_eq!(driver.run_cycle(&mut p).unwrap(), Some(4));
        assert_eq!(p.output(sink).unwrap(), &[0.1, 0.2, 0.3, 0.4]);

        assert_eq!(driver.run_cycle(&mut p).unwrap(), Some(2));
        assert_eq!(p.output(sink).unwrap(), &[0.5, 0.6, 0.0, 0.0]);

        assert_eq!(driver.run_cycle(&mut p).unwrap(), None);
        assert_eq!(p.cycles(), 2);
        assert_eq!(p.input(root).unwrap(), &[0.5, 0.6, 0.0, 0.0]);
        assert_eq!(driver.blocks(), 2);
    }

    #[test]
    fn test_run_cycle_requires_root() {
        let (mut p, _root, sink) = chain(4);
        let feeder = PcmFeeder::mono(vec![0.0; 8], 48_000).unwrap();
        let mut driver = Driver::new(feeder, sink);

        assert_eq!(driver.run_cycle(&mut p), Err(PipelineError::NotRoot(sink)));
        assert_eq!(driver.source().position(), 0);
    }

    #[test]
    fn test_exhausted_source_leaves_root_input_alone() {
        let (mut p, root, _sink) = chain(2);
        let feeder = PcmFeeder::mono(Vec::new(), 48_000).unwrap();
        let mut driver = Driver::new(feeder, root);

        p.input_mut(root).unwrap().copy_from_slice(&[0.25, -0.25]);
        assert_eq!(driver.run_cycle(&mut p).unwrap(), None);
        assert_eq!(p.input(root).unwrap(), &[0.25, -0.25]);
        assert_eq!(p.cycles(), 0);
    }

    #[test]
    fn test_run_to_end_counts_blocks() {
        let (mut p, root, _sink) = chain(3);
        let feeder = PcmFeeder::mono(vec![1.0; 10], 48_000).unwrap();
        let mut driver = Driver::new(feeder, root);

        let mut seen = Vec::new();
        let ran = driver.run_to_end(&mut p, |_, n| seen.push(n)).unwrap();
        assert_eq!(ran, 4);
        assert_eq!(seen, vec![3, 3, 3, 1]);
    }
}
