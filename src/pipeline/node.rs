//! Node abstraction for the pipeline.
//!
//! Two-layer design:
//! - **`Processor` trait**: the single transform hook; implement it for
//!   custom nodes and box them as plugins.
//! - **`BuiltinProcessor` enum**: the closed set of shipped variants. The
//!   compiler can inline match arms, so the hot path has no dynamic dispatch.
//!
//! `AnyProcessor` wraps either variant so the tree can handle both uniformly.

use crate::pipeline::buffer::{Buffer, Sample};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::id::NodeId;
use crate::pipeline::nodes::{ExtractorNode, NormalizeNode, PassthroughNode};

/// Label given to nodes constructed without one.
pub const DEFAULT_LABEL: &str = "unknown";

/// Context handed to a transform hook for one propagation cycle.
pub struct TransformContext<'a> {
    /// Node being updated.
    pub node: NodeId,
    /// Human-readable node label.
    pub label: &'a str,
    /// Block copied in from the parent (or written by the driver at the root).
    pub input: &'a [Sample],
    /// Output buffer. The transform writes its results here. Resizing it
    /// republishes the node's output length for its children.
    pub output: &'a mut Buffer,
    /// Index of the propagation cycle in progress.
    pub cycle: u64,
    /// The node's own span, for diagnostics from inside the kernel.
    pub span: &'a tracing::Span,
}

/// The transform capability every node provides.
///
/// Contract: read only `ctx.input`, write only `ctx.output`, never touch the
/// tree. Any working state must be owned by the processor itself.
pub trait Processor: Send {
    /// Human-readable name of this processor kind.
    fn name(&self) -> &str;

    /// Buffer lengths `(input, output)` to allocate when the caller does not
    /// give any.
    fn preferred_lengths(&self) -> Option<(usize, usize)> {
        None
    }

    /// Consume `ctx.input` and populate `ctx.output`.
    fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()>;
}

/// Enum dispatch for built-in processors.
pub enum BuiltinProcessor {
    Passthrough(PassthroughNode),
    Extractor(ExtractorNode),
    Normalize(NormalizeNode),
}

impl BuiltinProcessor {
    pub fn name(&self) -> &str {
        match self {
            BuiltinProcessor::Passthrough(n) => n.name(),
            BuiltinProcessor::Extractor(n) => n.name(),
            BuiltinProcessor::Normalize(n) => n.name(),
        }
    }

    pub fn preferred_lengths(&self) -> Option<(usize, usize)> {
        match self {
            BuiltinProcessor::Passthrough(n) => n.preferred_lengths(),
            BuiltinProcessor::Extractor(n) => n.preferred_lengths(),
            BuiltinProcessor::Normalize(n) => n.preferred_lengths(),
        }
    }

    pub fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
        match self {
            BuiltinProcessor::Passthrough(n) => n.transform(ctx),
            BuiltinProcessor::Extractor(n) => n.transform(ctx),
            BuiltinProcessor::Normalize(n) => n.transform(ctx),
        }
    }
}

/// Wrapper that holds either a built-in processor (enum dispatch) or a plugin
/// (trait object).
pub enum AnyProcessor {
    Builtin(BuiltinProcessor),
    Plugin(Box<dyn Processor>),
}

impl AnyProcessor {
    pub fn plugin(processor: impl Processor + 'static) -> Self {
        AnyProcessor::Plugin(Box::new(processor))
    }

    pub fn name(&self) -> &str {
        match self {
            AnyProcessor::Builtin(n) => n.name(),
            AnyProcessor::Plugin(n) => n.name(),
        }
    }

    pub fn preferred_lengths(&self) -> Option<(usize, usize)> {
        match self {
            AnyProcessor::Builtin(n) => n.preferred_lengths(),
            AnyProcessor::Plugin(n) => n.preferred_lengths(),
        }
    }

    pub fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
        match self {
            AnyProcessor::Builtin(n) => n.transform(ctx),
            AnyProcessor::Plugin(n) => n.transform(ctx),
        }
    }

    pub fn as_extractor(&self) -> Option<&ExtractorNode> {
        match self {
            AnyProcessor::Builtin(BuiltinProcessor::Extractor(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_normalize(&self) -> Option<&NormalizeNode> {
        match self {
            AnyProcessor::Builtin(BuiltinProcessor::Normalize(n)) => Some(n),
            _ => None,
        }
    }
}

impl From<PassthroughNode> for AnyProcessor {
    fn from(n: PassthroughNode) -> Self {
        AnyProcessor::Builtin(BuiltinProcessor::Passthrough(n))
    }
}

impl From<ExtractorNode> for AnyProcessor {
    fn from(n: ExtractorNode) -> Self {
        AnyProcessor::Builtin(BuiltinProcessor::Extractor(n))
    }
}

impl From<NormalizeNode> for AnyProcessor {
    fn from(n: NormalizeNode) -> Self {
        AnyProcessor::Builtin(BuiltinProcessor::Normalize(n))
    }
}

impl From<Box<dyn Processor>> for AnyProcessor {
    fn from(n: Box<dyn Processor>) -> Self {
        AnyProcessor::Plugin(n)
    }
}

/// Everything needed to construct a node.
pub struct NodeSpec {
    pub label: String,
    pub input_len: Option<usize>,
    pub output_len: Option<usize>,
    pub processor: AnyProcessor,
}

impl NodeSpec {
    /// A node whose lengths come from the processor (or zero if it has none).
    pub fn new(label: impl Into<String>, processor: impl Into<AnyProcessor>) -> Self {
        Self {
            label: label.into(),
            input_len: None,
            output_len: None,
            processor: processor.into(),
        }
    }

    /// A node labelled [`DEFAULT_LABEL`].
    pub fn unlabelled(processor: impl Into<AnyProcessor>) -> Self {
        Self::new(DEFAULT_LABEL, processor)
    }

    /// Same length for input and output.
    pub fn length(self, len: usize) -> Self {
        self.lengths(len, len)
    }

    pub fn lengths(mut self, input_len: usize, output_len: usize) -> Self {
        self.input_len = Some(input_len);
        self.output_len = Some(output_len);
        self
    }

    /// Final `(input, output)` lengths after inference.
    pub fn resolved_lengths(&self) -> (usize, usize) {
        let (pref_in, pref_out) = self.processor.preferred_lengths().unwrap_or((0, 0));
        (
            self.input_len.unwrap_or(pref_in),
            self.output_len.unwrap_or(pref_out),
        )
    }
}
