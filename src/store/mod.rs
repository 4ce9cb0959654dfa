//! Backend adapter - the narrow capability set the model requires from a
//! physical container.
//!
//! The core never touches bytes on disk itself; it drives a [`Store`]
//! implementation through directory-node enumeration, a flat per-node
//! attribute namespace (used by the directory encoding, see [`dir`]), and
//! per-(node, index) sample payloads. [`MemStore`] is the in-memory
//! reference implementation used by the writers and the test suite.
//!
//! Storage conventions layered on top of the adapter by the model:
//! the backend root node doubles as the root object; archive-level data
//! lives in reserved root attributes ([`ARCHIVE_META_KEY`],
//! [`ARCHIVE_SAMPLINGS_KEY`], [`ARCHIVE_VERSION_KEY`]); every object node
//! carries its metadata at [`OBJECT_META_KEY`] and its root compound in a
//! reserved [`PROPERTIES_NODE`] child; all other children of an object
//! node are child objects.

pub mod codec;
pub mod dir;
mod mem;

pub use mem::MemStore;

use crate::core::SamplePayload;
use crate::util::Result;

/// Stable identifier of a directory node inside one store.
pub type NodeId = u64;

/// Value of one attribute in a node's flat namespace.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    /// UTF-8 string value.
    Str(String),
    /// Raw byte value.
    Bytes(Vec<u8>),
}

impl AttrValue {
    /// String view, None for byte values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Bytes(_) => None,
        }
    }

    /// Byte view of either variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Str(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// Root attribute holding the archive metadata string.
pub const ARCHIVE_META_KEY: &str = ".archive.meta";
/// Root attribute holding the encoded time sampling registry.
pub const ARCHIVE_SAMPLINGS_KEY: &str = ".archive.samplings";
/// Root attribute holding the archive format version.
pub const ARCHIVE_VERSION_KEY: &str = ".archive.version";
/// Object attribute holding the object's metadata string.
pub const OBJECT_META_KEY: &str = ".meta";
/// Reserved child node of every object holding its root compound.
pub const PROPERTIES_NODE: &str = ".prop";

/// Archive format version written by this library.
pub const CURRENT_VERSION: u32 = 1;

/// Minimal physical-container capability set.
///
/// Implementations use interior mutability: readers and the single writer
/// share the store through `Arc<dyn Store>`. All methods are expected to
/// be cheap or to block only on the container's own I/O; the model and
/// the layering engine never block by themselves.
pub trait Store: Send + Sync {
    /// The root directory node.
    fn root(&self) -> NodeId;

    /// Ordered child node names of a directory node.
    fn children(&self, node: NodeId) -> Result<Vec<String>>;

    /// Resolve a child node by name.
    fn lookup(&self, node: NodeId, name: &str) -> Result<Option<NodeId>>;

    /// All attributes of a node, in insertion order.
    fn attrs(&self, node: NodeId) -> Result<Vec<(String, AttrValue)>>;

    /// One attribute of a node.
    fn attr(&self, node: NodeId, key: &str) -> Result<Option<AttrValue>>;

    /// Number of samples appended to a node.
    fn num_samples(&self, node: NodeId) -> Result<usize>;

    /// Payload and shape of one sample.
    fn read_sample(&self, node: NodeId, index: usize) -> Result<SamplePayload>;

    /// Create a child node. Fails if the name already exists.
    fn add_child(&self, node: NodeId, name: &str) -> Result<NodeId>;

    /// Set an attribute (insert or overwrite in place).
    fn set_attr(&self, node: NodeId, key: &str, value: AttrValue) -> Result<()>;

    /// Append the next sample to a node.
    fn append_sample(&self, node: NodeId, payload: &SamplePayload) -> Result<()>;
}
