//! # Strata
//!
//! Hierarchical, immutable-on-write, time-sampled property archive for
//! interchanging scene and asset data between applications, with a
//! multi-archive layering engine.
//!
//! An archive is a typed directory tree: objects contain properties,
//! properties contain further properties or time-varying samples. The
//! model is independent of the physical container that stores the bytes;
//! containers plug in through the narrow [`store::Store`] adapter.
//!
//! ## Modules
//!
//! - [`util`] - basic types (POD, DataType, Dimensions, errors)
//! - [`core`] - value types (TimeSampling, MetaData, headers, digests)
//! - [`store`] - backend adapter, directory encoding, in-memory store
//! - [`abc`] - the object model (IArchive/OArchive and friends)
//! - [`layer`] - multi-archive composition (union-merge, replace, prune)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use strata::prelude::*;
//!
//! let store = Arc::new(MemStore::new());
//! let mut writer = OArchive::create(store.clone(), "scene")?;
//! let mut root = writer.root()?;
//! let mut props = root.properties();
//! let mut p = props.add_array(PropertyHeader::array("P", DataType::VEC3F))?;
//! p.append_typed::<f32>(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0])?;
//! writer.finish()?;
//!
//! let archive = IArchive::open(store, "scene")?;
//! let p = archive.root().properties()?.array("P")?;
//! assert_eq!(p.num_samples()?, 1);
//! ```

pub mod abc;
pub mod core;
pub mod layer;
pub mod store;
pub mod util;

// Re-export commonly used types
pub use abc::{IArchive, IObject, IProperty, OArchive, OObject};
pub use layer::compose;
pub use util::{Chrono, DataType, Error, PlainOldDataType, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::abc::{
        IArchive, IArray, ICompound, IObject, IProperty, IScalar, OArchive, OArray, OCompound,
        OObject, OScalar,
    };
    pub use crate::core::{
        MetaData, ObjectHeader, PropertyHeader, PropertyType, SamplePayload, SampleSelector,
        TimeSampling,
    };
    pub use crate::layer::compose;
    pub use crate::store::{MemStore, Store};
    pub use crate::util::{Chrono, DataType, Dimensions, Error, PlainOldDataType, Result};
}
