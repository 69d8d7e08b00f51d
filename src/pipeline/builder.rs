//! Standard pipeline layouts.

use crate::config::PipelineConfig;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::NodeSpec;
use crate::pipeline::nodes::{ExtractorNode, NormalizeNode, PassthroughNode};
use crate::pipeline::tree::Pipeline;

/// IDs of the nodes created by [`PipelineBuilder::build_envelope_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeChainIds {
    pub source: NodeId,
    pub extractor: NodeId,
    pub normalize: NodeId,
}

/// Builder for the envelope pipeline.
pub struct PipelineBuilder {
    config: PipelineConfig,
    span: tracing::Span,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            span: tracing::Span::none(),
        }
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Build the envelope chain, every buffer sized to `block_size`:
    /// ```text
    /// source (Passthrough) ──► extractor (Extractor) ──► normalize (Normalize)
    /// ```
    /// The driver writes blocks into `source`.
    pub fn build_envelope_chain(self) -> PipelineResult<(Pipeline, EnvelopeChainIds)> {
        let block = self.config.block_size;
        let mut pipeline = Pipeline::with_config(&self.config).with_span(self.span);

        let source = pipeline.add_root(NodeSpec::new("source", PassthroughNode::with_length(block)))?;
        let extractor = pipeline.add_node(
            NodeSpec::new(
                "extractor",
                ExtractorNode::from_settings(&self.config.extractor, block),
            ),
            Some(source),
        )?;
        let normalize = pipeline.add_node(
            NodeSpec::new("normalize", NormalizeNode::new()).length(block),
            Some(extractor),
        )?;

        tracing::info!(
            "Built envelope chain: block {} samples, window {}",
            block,
            self.config.extractor.window_length
        );

        let ids = EnvelopeChainIds {
            source,
            extractor,
            normalize,
        };
        Ok((pipeline, ids))
    }
}
