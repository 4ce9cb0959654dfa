//! Archive object model - the main read/write API.
//!
//! Reading:
//! - [`IArchive`] - open an archive over a backend store
//! - [`IObject`] - hierarchy nodes with lazily cached children
//! - [`ICompound`] / [`IScalar`] / [`IArray`] - property access,
//!   dispatched through the [`IProperty`] tag
//!
//! Writing (single-writer, append-only, top-down):
//! - [`OArchive`] - create an archive, register time samplings, finish
//! - [`OObject`] / [`OCompound`] / [`OScalar`] / [`OArray`] - builders
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use strata::abc::{IArchive, OArchive};
//! use strata::store::MemStore;
//!
//! let store = Arc::new(MemStore::new());
//! let mut writer = OArchive::create(store.clone(), "scene")?;
//! let mut root = writer.root()?;
//! let mut xform = root.add_child("xform", Default::default())?;
//! writer.finish()?;
//!
//! let archive = IArchive::open(store, "scene")?;
//! for child in archive.root().children()? {
//!     println!("{}", child.name());
//! }
//! ```

mod archive;
mod object;
mod property;

pub(crate) use archive::ArchiveCore;

pub use archive::{
    IArchive, OArchive, APPLICATION_KEY, DATE_WRITTEN_KEY, USER_DESCRIPTION_KEY,
    WRITER_VERSION_KEY,
};
pub use object::{IObject, OObject};
pub use property::{IArray, ICompound, IProperty, IScalar, OArray, OCompound, OScalar};
