//! Fundamental types used throughout the crate.
//!
//! - [`PlainOldDataType`] - primitive storage kinds
//! - [`DataType`] - POD kind + extent
//! - [`Dimensions`] - array sample shapes
//! - [`Error`] / [`Result`] - error handling

mod data_type;
mod dimensions;
mod error;
mod pod;

pub use data_type::*;
pub use dimensions::*;
pub use error::*;
pub use pod::*;

/// Time value in seconds.
pub type Chrono = f64;
