//! Error handling for beatline
//!
//! This module defines the crate-level error type and a Result alias used by
//! the configuration and driver layers. Tree and buffer failures have their
//! own [`PipelineError`] and convert into this type.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for beatline operations
#[derive(Error, Debug)]
pub enum BeatlineError {
    /// Errors from the node tree or its buffers
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to a PCM source handed to the driver
    #[error("Source error: {0}")]
    Source(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BeatlineError>,
    },
}

impl BeatlineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BeatlineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for beatline operations
pub type Result<T> = std::result::Result<T, BeatlineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| BeatlineError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| BeatlineError::from(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NodeId;

    #[test]
    fn test_error_display() {
        let err = BeatlineError::Config("block_size must be greater than zero".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: block_size must be greater than zero"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = BeatlineError::Source("no channels".to_string());
        let with_ctx = err.with_context("Failed to open feeder");
        assert!(with_ctx.to_string().contains("Failed to open feeder"));
        assert!(with_ctx.to_string().contains("no channels"));
    }

    #[test]
    fn test_pipeline_error_context() {
        let res: std::result::Result<(), PipelineError> =
            Err(PipelineError::UnknownNode(NodeId(7)));
        let err = res.context("Driving root").unwrap_err();
        assert!(err.to_string().starts_with("Driving root"));
        assert!(err.to_string().contains("NodeId(7)"));
    }
}
