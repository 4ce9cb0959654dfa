//! Sample payloads and sample selection.

use std::sync::Arc;

use super::TimeSampling;
use crate::util::{Chrono, Dimensions};

/// One time slice of property data: raw bytes plus shape.
///
/// Payload bytes are shared, so cloning a sample or handing it to several
/// readers never copies the data.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplePayload {
    /// Element bytes, laid out contiguously.
    pub data: Arc<[u8]>,
    /// Shape of the sample. Scalar samples use the rank-0 shape.
    pub dimensions: Dimensions,
}

impl SamplePayload {
    /// Create a payload from bytes and a shape.
    pub fn new(data: Vec<u8>, dimensions: Dimensions) -> Self {
        Self {
            data: data.into(),
            dimensions,
        }
    }

    /// Create a rank-0 (scalar) payload.
    pub fn scalar(data: Vec<u8>) -> Self {
        Self::new(data, Dimensions::scalar())
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-byte payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of elements described by the shape.
    pub fn num_points(&self) -> usize {
        self.dimensions.num_points()
    }
}

/// Selects a sample by index or by time.
#[derive(Clone, Copy, Debug)]
pub enum SampleSelector {
    /// Exact index.
    Index(usize),
    /// Largest sample at or before the time.
    TimeFloor(Chrono),
    /// Smallest sample at or after the time.
    TimeCeil(Chrono),
    /// Sample nearest to the time.
    TimeNear(Chrono),
}

impl SampleSelector {
    /// Selector for the first/static sample.
    pub const fn first() -> Self {
        Self::Index(0)
    }

    /// Resolve to a concrete sample index for a property with the given
    /// sampling and sample count. Time-based selectors clamp; `Index` is
    /// returned as-is and bounds-checked by the property read itself.
    pub fn resolve(&self, sampling: &TimeSampling, num_samples: usize) -> usize {
        match *self {
            Self::Index(i) => i,
            Self::TimeFloor(t) => sampling.floor_index(t, num_samples).0,
            Self::TimeCeil(t) => sampling.ceil_index(t, num_samples).0,
            Self::TimeNear(t) => sampling.near_index(t, num_samples).0,
        }
    }
}

impl Default for SampleSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<usize> for SampleSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Chrono> for SampleSelector {
    fn from(time: Chrono) -> Self {
        Self::TimeNear(time)
    }
}
