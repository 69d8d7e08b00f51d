//! Tree-structured, push-based signal pipeline.
//!
//! Nodes own an input and an output block. A block pushed into a root is
//! transformed, then copied into each child's input in order, recursively:
//!
//! ```text
//! driver ──► [source] ──► [extractor] ──► [normalize]
//!                    └──► [other child ...]
//! ```
//!
//! # Design
//!
//! - **Arena**: nodes live in a flat slot `Vec`; `NodeId` is the slot index.
//!   Parents are plain ids, children are owned id lists.
//! - **Enum dispatch**: `BuiltinProcessor` covers shipped variants, boxed
//!   `Processor` plugins cover the rest.
//! - **Fail loudly**: every inter-node copy is length-checked and reported as
//!   `PipelineError::OutOfBounds`.
//! - **Single-threaded**: `propagate` runs to completion on the caller's
//!   thread; no locking inside the tree.

pub mod buffer;
pub mod builder;
pub mod error;
pub mod id;
pub mod node;
pub mod nodes;
pub mod tree;

pub use buffer::{Buffer, LengthMismatch, Sample};
pub use builder::{EnvelopeChainIds, PipelineBuilder};
pub use error::{PipelineError, PipelineResult};
pub use id::NodeId;
pub use node::{AnyProcessor, BuiltinProcessor, NodeSpec, Processor, TransformContext, DEFAULT_LABEL};
pub use tree::{Pipeline, WireOutcome};
