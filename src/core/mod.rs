//! Core value types of the archive model.
//!
//! - [`TimeSampling`] - index/time mapping for animated properties
//! - [`MetaData`] - ordered key/value metadata with layering flags
//! - [`ObjectHeader`] / [`PropertyHeader`] - tree node descriptions
//! - [`SamplePayload`] / [`SampleSelector`] - sample data and selection
//! - [`Digest`] - content digests for structural equality

mod digest;
mod header;
mod metadata;
mod sample;
mod time_sampling;

pub use digest::{digest_bytes, Digest, Hasher};
pub use header::{ObjectHeader, PropertyHeader, PropertyType};
pub use metadata::MetaData;
pub use sample::{SamplePayload, SampleSelector};
pub use time_sampling::{TimeSampling, TimeSamplingType, TIME_TOLERANCE};
