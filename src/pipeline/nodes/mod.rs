//! Built-in processing node implementations.

pub mod extractor;
pub mod normalize;
pub mod passthrough;

pub use extractor::{ExtractorNode, MAX_WINDOW_LENGTH};
pub use normalize::NormalizeNode;
pub use passthrough::PassthroughNode;
