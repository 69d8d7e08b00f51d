//! Numeric kernels called by pipeline nodes.
//!
//! Everything here is a plain function or a self-contained struct over raw
//! sample slices:
//! - Window generation (Hann, Hamming, Blackman)
//! - FFT-based fast convolution
//! - Rectification and attack/release envelope following
//! - Peak measurement and normalisation
//!
//! None of these know about the node tree.

pub mod convolution;
pub mod envelope;
pub mod normalize;
pub mod window;

pub use convolution::{working_len, FastConvolver};
pub use envelope::{rectify, EnvelopeFollower};
pub use normalize::{normalize_to_unit, peak_abs};
pub use window::{normalize_dc_gain, WindowFunction};
