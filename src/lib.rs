//! # Beatline: push-based audio signal pipeline
//!
//! Processing nodes arranged in a tree. The driver pushes a block of samples
//! into a root node; each node transforms its input into its output, which is
//! then copied into every child's input, depth first, before the call
//! returns.
//!
//! ## Architecture
//!
//! - **Pipeline**: node arena, wiring, buffer ownership and propagation
//! - **Nodes**: passthrough source, envelope extractor, peak normaliser, or
//!   any boxed [`pipeline::Processor`]
//! - **Analysis**: numeric kernels (windows, FFT convolution, follower)
//! - **Driver**: feeds blocks from a [`driver::BlockSource`] into a root
//!
//! ## Example
//!
//! ```no_run
//! use beatline::{
//!     config::PipelineConfig,
//!     driver::{Driver, PcmFeeder},
//!     pipeline::PipelineBuilder,
//! };
//!
//! fn main() -> beatline::Result<()> {
//!     beatline::logging::init_tracing();
//!
//!     let config = PipelineConfig::load("beatline.toml")?;
//!     let (mut pipeline, ids) = PipelineBuilder::new(config).build_envelope_chain()?;
//!
//!     let pcm = vec![0.0f32; 44_100 * 2];
//!     let mut driver = Driver::new(PcmFeeder::new(pcm, 2, 44_100)?, ids.source);
//!     driver.run_to_end(&mut pipeline, |p, _| {
//!         let envelope = p.output(ids.normalize).unwrap_or_default();
//!         tracing::info!("peak {:.3}", envelope.iter().cloned().fold(0.0, f32::max));
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod pipeline;

// Re-export commonly used types
pub use config::{ExtractorSettings, PipelineConfig};
pub use driver::{BlockSource, Driver, PcmFeeder};
pub use error::{BeatlineError, Result, ResultExt};
pub use pipeline::{NodeId, NodeSpec, Pipeline, PipelineBuilder, PipelineError, WireOutcome};
