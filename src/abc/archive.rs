//! Archive handles - the top-level containers.
//!
//! [`IArchive`] opens an existing archive through a backend [`Store`] and
//! owns the time sampling registry, archive metadata and the root object.
//! [`OArchive`] builds a new archive top-down through the same adapter.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::core::{MetaData, ObjectHeader, TimeSampling};
use crate::store::{
    codec, Store, ARCHIVE_META_KEY, ARCHIVE_SAMPLINGS_KEY, ARCHIVE_VERSION_KEY, CURRENT_VERSION,
    OBJECT_META_KEY, PROPERTIES_NODE,
};
use crate::util::{Error, Result};

use super::object::{IObject, OObject};

/// Archive metadata key: application that wrote the archive.
pub const APPLICATION_KEY: &str = "application";
/// Archive metadata key: writing library version.
pub const WRITER_VERSION_KEY: &str = "writerVersion";
/// Archive metadata key: write timestamp.
pub const DATE_WRITTEN_KEY: &str = "dateWritten";
/// Archive metadata key: free-form user description.
pub const USER_DESCRIPTION_KEY: &str = "userDescription";

/// Shared read-side state of one archive: registry, metadata and the
/// backend handle. Every live object/property of the archive holds this,
/// so the tree keeps its archive state alive for as long as any handle
/// is outstanding.
pub(crate) struct ArchiveCore {
    pub(crate) name: String,
    pub(crate) meta: MetaData,
    pub(crate) samplings: Vec<TimeSampling>,
    pub(crate) max_samples: Vec<u32>,
}

impl ArchiveCore {
    /// Resolve a registry index, as referenced by property headers.
    pub(crate) fn time_sampling(&self, index: u32) -> Result<&TimeSampling> {
        self.samplings
            .get(index as usize)
            .ok_or(Error::TimeSamplingOutOfBounds {
                index: index as usize,
                count: self.samplings.len(),
            })
    }
}

// ============================================================================
// IArchive
// ============================================================================

/// Read-only archive handle.
///
/// Cheap to clone; clones share the cached object tree.
#[derive(Clone)]
pub struct IArchive {
    core: Arc<ArchiveCore>,
    root: IObject,
}

impl IArchive {
    /// Open an archive from a backend store.
    ///
    /// Decodes the archive metadata, format version and time sampling
    /// registry eagerly so a corrupt or incompatible archive fails here,
    /// before any tree traversal.
    pub fn open(store: Arc<dyn Store>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let root_node = store.root();

        let version = store
            .attr(root_node, ARCHIVE_VERSION_KEY)?
            .and_then(|v| v.as_str().and_then(|s| s.parse::<u32>().ok()))
            .ok_or_else(|| Error::malformed("missing or invalid archive version"))?;
        if version != CURRENT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let meta = store
            .attr(root_node, ARCHIVE_META_KEY)?
            .and_then(|v| v.as_str().map(MetaData::parse))
            .ok_or_else(|| Error::malformed("missing archive metadata"))?;

        let samplings_buf = store
            .attr(root_node, ARCHIVE_SAMPLINGS_KEY)?
            .ok_or_else(|| Error::malformed("missing time sampling registry"))?;
        let (samplings, max_samples) = codec::decode_samplings(samplings_buf.as_bytes())?;
        if samplings.first().map(|ts| ts.is_identity()) != Some(true) {
            return Err(Error::malformed(
                "registry index 0 must be the static sampling",
            ));
        }

        debug!(
            archive = %name,
            samplings = samplings.len(),
            "opened archive"
        );

        let core = Arc::new(ArchiveCore {
            name,
            meta,
            samplings,
            max_samples,
        });

        let root_meta = store
            .attr(root_node, OBJECT_META_KEY)?
            .and_then(|v| v.as_str().map(MetaData::parse))
            .unwrap_or_default();
        let header = ObjectHeader::new("", "").with_meta_data(root_meta);
        let root = IObject::from_store(core.clone(), store, root_node, header)?;

        Ok(Self { core, root })
    }

    /// Assemble a virtual archive (used by the layering engine).
    pub(crate) fn from_parts(core: Arc<ArchiveCore>, root: IObject) -> Self {
        Self { core, root }
    }

    /// Archive name (diagnostic label, typically the container path).
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// The root object.
    pub fn root(&self) -> &IObject {
        &self.root
    }

    /// Number of time samplings in the registry.
    pub fn num_time_samplings(&self) -> usize {
        self.core.samplings.len()
    }

    /// Registry entry by index.
    pub fn time_sampling(&self, index: usize) -> Option<&TimeSampling> {
        self.core.samplings.get(index)
    }

    /// Largest sample count written against a registry index, when the
    /// writing library recorded it.
    pub fn max_num_samples_for_time_sampling(&self, index: usize) -> Option<usize> {
        self.core.max_samples.get(index).map(|&n| n as usize)
    }

    /// Archive-level metadata.
    pub fn meta_data(&self) -> &MetaData {
        &self.core.meta
    }

    /// Application that wrote the archive.
    pub fn application(&self) -> Option<&str> {
        self.core.meta.get(APPLICATION_KEY)
    }

    /// Version of the library that wrote the archive.
    pub fn writer_version(&self) -> Option<&str> {
        self.core.meta.get(WRITER_VERSION_KEY)
    }

    /// Timestamp recorded at write time.
    pub fn date_written(&self) -> Option<&str> {
        self.core.meta.get(DATE_WRITTEN_KEY)
    }

    /// Free-form user description.
    pub fn user_description(&self) -> Option<&str> {
        self.core.meta.get(USER_DESCRIPTION_KEY)
    }

    /// Find an object by slash-separated path (`/xform/shape`).
    pub fn find_object(&self, path: &str) -> Result<Option<IObject>> {
        let mut current = self.root.clone();
        for part in path.split('/').filter(|s| !s.is_empty()) {
            match current.child(part) {
                Ok(child) => current = child,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        Ok(Some(current))
    }

    /// Check whether an object exists at the given path.
    pub fn has_object(&self, path: &str) -> Result<bool> {
        Ok(self.find_object(path)?.is_some())
    }
}

// ============================================================================
// OArchive
// ============================================================================

/// Write-side registry state shared by the archive writer and every
/// property writer spawned from it. Property appends record per-sampling
/// max sample counts here.
pub(crate) struct WriterShared {
    pub(crate) samplings: Vec<TimeSampling>,
    pub(crate) max_samples: Vec<u32>,
}

/// Writable archive builder.
///
/// Archives are built top-down and write-once: create the root, add
/// children and properties, append samples in increasing order, then
/// [`OArchive::finish`].
pub struct OArchive {
    store: Arc<dyn Store>,
    name: String,
    meta: MetaData,
    shared: Arc<RwLock<WriterShared>>,
    finished: bool,
}

impl OArchive {
    /// Create a fresh archive in the given store.
    ///
    /// The store must be empty (only its root node); registry index 0 is
    /// reserved for the static sampling.
    pub fn create(store: Arc<dyn Store>, name: impl Into<String>) -> Result<Self> {
        let root = store.root();
        if !store.children(root)?.is_empty() {
            return Err(Error::WriteFailed("store is not empty".into()));
        }
        store.set_attr(root, OBJECT_META_KEY, MetaData::new().serialize().into())?;
        store.add_child(root, PROPERTIES_NODE)?;
        Ok(Self {
            store,
            name: name.into(),
            meta: MetaData::new(),
            shared: Arc::new(RwLock::new(WriterShared {
                samplings: vec![TimeSampling::IDENTITY],
                max_samples: vec![0],
            })),
            finished: false,
        })
    }

    /// Archive name (diagnostic label).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a time sampling, deduplicating: re-adding an equal sampling
    /// returns the existing index.
    pub fn add_time_sampling(&mut self, sampling: TimeSampling) -> u32 {
        let mut shared = self.shared.write();
        if let Some(i) = shared.samplings.iter().position(|ts| *ts == sampling) {
            return i as u32;
        }
        shared.samplings.push(sampling);
        shared.max_samples.push(0);
        (shared.samplings.len() - 1) as u32
    }

    /// Number of time samplings registered so far.
    pub fn num_time_samplings(&self) -> usize {
        self.shared.read().samplings.len()
    }

    /// Registry entry by index.
    pub fn time_sampling(&self, index: usize) -> Option<TimeSampling> {
        self.shared.read().samplings.get(index).cloned()
    }

    /// Mutable archive-level metadata.
    pub fn meta_data_mut(&mut self) -> &mut MetaData {
        &mut self.meta
    }

    /// Record the writing application name.
    pub fn set_application(&mut self, app: &str) {
        self.meta.set(APPLICATION_KEY, app);
    }

    /// Record the writing library version.
    pub fn set_writer_version(&mut self, version: &str) {
        self.meta.set(WRITER_VERSION_KEY, version);
    }

    /// Record the write timestamp.
    pub fn set_date_written(&mut self, date: &str) {
        self.meta.set(DATE_WRITTEN_KEY, date);
    }

    /// Record a free-form user description.
    pub fn set_user_description(&mut self, description: &str) {
        self.meta.set(USER_DESCRIPTION_KEY, description);
    }

    /// Writer for the root object.
    pub fn root(&self) -> Result<OObject> {
        OObject::open_node(
            self.store.clone(),
            self.shared.clone(),
            self.store.root(),
            ObjectHeader::new("", ""),
        )
    }

    /// Persist archive metadata, version and the registry. Must be called
    /// once all samples are written; a reader opening the store before
    /// this sees a missing-registry error.
    pub fn finish(mut self) -> Result<()> {
        let root = self.store.root();
        self.store
            .set_attr(root, ARCHIVE_META_KEY, self.meta.serialize().into())?;
        self.store.set_attr(
            root,
            ARCHIVE_VERSION_KEY,
            CURRENT_VERSION.to_string().into(),
        )?;
        let shared = self.shared.read();
        let buf = codec::encode_samplings(&shared.samplings, &shared.max_samples);
        drop(shared);
        self.store
            .set_attr(root, ARCHIVE_SAMPLINGS_KEY, buf.into())?;
        self.finished = true;
        debug!(archive = %self.name, "finished archive");
        Ok(())
    }
}

impl Drop for OArchive {
    fn drop(&mut self) {
        if !self.finished {
            warn!(archive = %self.name, "archive writer dropped without finish()");
        }
    }
}
