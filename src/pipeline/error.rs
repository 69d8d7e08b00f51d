//! Pipeline-specific error types.
//!
//! Only hard failures live here. Soft outcomes of wiring calls (re-adding an
//! existing child, setting a node as its own parent) are reported through
//! [`WireOutcome`](crate::pipeline::WireOutcome) instead.

use crate::pipeline::id::NodeId;
use thiserror::Error;

/// Errors that can occur within the pipeline tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A node was wired as its own child.
    #[error("Node {node:?} cannot be its own child")]
    SelfReference { node: NodeId },

    /// Attaching `child` under `parent` would close a loop through the ancestry.
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    /// A copied block did not match the destination buffer length.
    #[error("Node {node:?} ('{label}') expected {expected} samples, got {actual}")]
    OutOfBounds {
        node: NodeId,
        label: String,
        expected: usize,
        actual: usize,
    },

    /// A buffer of the requested length could not be allocated.
    #[error("Failed to allocate a buffer of {len} samples")]
    Allocation { len: usize },

    /// The handle does not name a live node.
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    /// The driver was pointed at a node that still has a parent.
    #[error("Node {0:?} has a parent and cannot be driven as a root")]
    NotRoot(NodeId),

    /// A transform hook reported a failure.
    #[error("Transform on node {node:?} failed: {message}")]
    Transform { node: NodeId, message: String },
}

impl PipelineError {
    /// Structural and bounds errors leave the tree unchanged; allocation
    /// failures are the only kind the core treats as unrecoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Allocation { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
