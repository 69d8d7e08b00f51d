//! Fixed-length sample blocks owned by pipeline nodes.
//!
//! `Buffer` is allocated once per node slot (one for input, one for output)
//! and reused every propagation cycle. Data only crosses a parent/child
//! boundary by value copy through [`Buffer::copy_from`]; a buffer is never
//! shared between nodes.

use crate::pipeline::error::{PipelineError, PipelineResult};

/// Real-valued audio sample.
pub type Sample = f32;

/// Length disagreement between a source block and a destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// A zero-initialised, fixed-length block of samples.
#[derive(Clone, PartialEq)]
pub struct Buffer {
    samples: Box<[Sample]>,
}

impl Buffer {
    /// Allocate a zeroed buffer of `len` samples.
    ///
    /// The allocation is attempted with `try_reserve_exact`, so an impossible
    /// request surfaces as [`PipelineError::Allocation`] instead of aborting.
    pub fn zeroed(len: usize) -> PipelineResult<Self> {
        let mut samples: Vec<Sample> = Vec::new();
        samples
            .try_reserve_exact(len)
            .map_err(|_| PipelineError::Allocation { len })?;
        samples.resize(len, 0.0);
        Ok(Self {
            samples: samples.into_boxed_slice(),
        })
    }

    /// A buffer with no storage, used by nodes whose size is decided later.
    pub fn empty() -> Self {
        Self {
            samples: Box::default(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Reallocate to `len` zeroed samples.
    ///
    /// The replacement is fully built before the old block is released, so a
    /// failed allocation leaves both storage and length as they were.
    pub fn resize(&mut self, len: usize) -> PipelineResult<()> {
        let fresh = Self::zeroed(len)?;
        *self = fresh;
        Ok(())
    }

    /// Copy `src` into this buffer. The lengths must match exactly; on a
    /// mismatch nothing is written.
    pub fn copy_from(&mut self, src: &[Sample]) -> Result<(), LengthMismatch> {
        if src.len() != self.samples.len() {
            return Err(LengthMismatch {
                expected: self.samples.len(),
                actual: src.len(),
            });
        }
        self.samples.copy_from_slice(src);
        Ok(())
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer").field("len", &self.len()).finish()
    }
}
