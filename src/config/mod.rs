//! Configuration module for beatline
//!
//! A [`PipelineConfig`] describes the block size the driver pushes, whether
//! per-node propagation traces are emitted, and the envelope extractor's
//! kernel parameters. Configs are read from TOML or JSON; the format is
//! picked from the file extension.
//!
//! # Example
//!
//! ```toml
//! block_size = 1024
//! trace_propagation = false
//!
//! [extractor]
//! window_length = 256
//! window = "hann"
//! attack = 200.0
//! release = 2000.0
//! ```

use crate::analysis::WindowFunction;
use crate::error::{BeatlineError, Result};
use crate::pipeline::nodes::MAX_WINDOW_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of samples per pushed block
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Default envelope analysis window in samples
pub const DEFAULT_WINDOW_LENGTH: usize = 512;

/// Default follower attack time constant in samples
pub const DEFAULT_ATTACK: f32 = 200.0;

/// Default follower release time constant in samples
pub const DEFAULT_RELEASE: f32 = 2000.0;

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Samples per block written into the root node
    pub block_size: usize,

    /// Emit a trace event for every node update
    pub trace_propagation: bool,

    /// Envelope extractor parameters
    pub extractor: ExtractorSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            trace_propagation: true,
            extractor: ExtractorSettings::default(),
        }
    }
}

/// Kernel parameters for [`ExtractorNode`](crate::pipeline::nodes::ExtractorNode)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Analysis window length in samples (clamped to `MAX_WINDOW_LENGTH`)
    pub window_length: usize,

    /// Window shape whose decaying half smooths the rectified signal
    pub window: WindowFunction,

    /// Attack time constant in samples
    pub attack: f32,

    /// Release time constant in samples
    pub release: f32,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            window: WindowFunction::Hann,
            attack: DEFAULT_ATTACK,
            release: DEFAULT_RELEASE,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a `.toml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents)?,
            Some("toml") | None => Self::from_toml_str(&contents)?,
            Some(other) => {
                return Err(BeatlineError::Config(format!(
                    "Unsupported config extension '{}'",
                    other
                )))
            }
        };

        tracing::info!("Loaded pipeline config from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| BeatlineError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| BeatlineError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BeatlineError::Serialization(e.to_string()))
    }

    /// Reject values no pipeline can run with.
    ///
    /// An oversized window is accepted here; the extractor clamps it.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(BeatlineError::Config(
                "block_size must be greater than zero".to_string(),
            ));
        }
        if self.extractor.window_length == 0 {
            return Err(BeatlineError::Config(
                "extractor.window_length must be greater than zero".to_string(),
            ));
        }
        if !self.extractor.attack.is_finite() || !self.extractor.release.is_finite() {
            return Err(BeatlineError::Config(
                "extractor time constants must be finite".to_string(),
            ));
        }
        if self.extractor.window_length > MAX_WINDOW_LENGTH {
            tracing::debug!(
                "extractor.window_length {} will be clamped to {}",
                self.extractor.window_length,
                MAX_WINDOW_LENGTH
            );
        }
        Ok(())
    }
}
