//! Objects - named tree nodes owning one compound property and an
//! ordered list of child objects.
//!
//! Readers are built lazily: looking up a child constructs it from its
//! header on first access and parks it in a weak-backed cache, so
//! repeated lookups of a live child return the same instance while
//! released subtrees can be collected and rebuilt later.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use crate::core::{Digest, Hasher, MetaData, ObjectHeader, PropertyHeader};
use crate::layer::stack::{merge_children, ChildFlags, MergedChild};
use crate::store::{NodeId, Store, OBJECT_META_KEY, PROPERTIES_NODE};
use crate::util::{Error, Result};

use super::archive::{ArchiveCore, WriterShared};
use super::property::{mix_meta, CompoundInner, ICompound, OCompound};

/// Join a parent path and a child name.
pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Reject names that would collide with reserved node names or paths.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::WriteFailed("empty name".into()));
    }
    if name.contains('/') {
        return Err(Error::WriteFailed(format!("name '{}' contains '/'", name)));
    }
    if name.starts_with('.') {
        return Err(Error::WriteFailed(format!(
            "name '{}' starts with reserved '.'",
            name
        )));
    }
    Ok(())
}

// ============================================================================
// IObject
// ============================================================================

pub(crate) enum ObjectSource {
    /// Backed by a store node of one physical archive.
    Store {
        core: Arc<ArchiveCore>,
        store: Arc<dyn Store>,
        node: NodeId,
        /// Child object names in insertion order (reserved nodes filtered).
        child_names: Vec<String>,
    },
    /// Overlay of the same path across several layers, priority first.
    Layered {
        layers: Vec<IObject>,
        plan: Vec<MergedChild>,
    },
}

pub(crate) struct ObjectInner {
    header: ObjectHeader,
    source: ObjectSource,
    children: RwLock<HashMap<String, Weak<ObjectInner>>>,
    props: RwLock<Weak<CompoundInner>>,
}

/// Read-only object handle. Cheap to clone; clones are the same instance.
#[derive(Clone)]
pub struct IObject {
    inner: Arc<ObjectInner>,
}

impl IObject {
    /// Construct over a store node, resolving the child name list.
    pub(crate) fn from_store(
        core: Arc<ArchiveCore>,
        store: Arc<dyn Store>,
        node: NodeId,
        header: ObjectHeader,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Self::store_inner(core, store, node, header)?),
        })
    }

    fn store_inner(
        core: Arc<ArchiveCore>,
        store: Arc<dyn Store>,
        node: NodeId,
        header: ObjectHeader,
    ) -> Result<ObjectInner> {
        let child_names = store
            .children(node)?
            .into_iter()
            .filter(|n| !n.starts_with('.'))
            .collect();
        Ok(ObjectInner {
            header,
            source: ObjectSource::Store {
                core,
                store,
                node,
                child_names,
            },
            children: RwLock::new(HashMap::new()),
            props: RwLock::new(Weak::new()),
        })
    }

    /// Construct an overlay over the same path in several layers.
    pub(crate) fn layered(layers: Vec<IObject>, header: ObjectHeader) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Self::layered_inner(layers, header)?),
        })
    }

    fn layered_inner(layers: Vec<IObject>, header: ObjectHeader) -> Result<ObjectInner> {
        let mut sets = Vec::with_capacity(layers.len());
        for layer in &layers {
            let mut set = Vec::new();
            for name in layer.child_names() {
                let meta = layer.child_meta(&name)?.unwrap_or_default();
                set.push(ChildFlags {
                    name,
                    prune: meta.is_prune(),
                    replace: meta.is_replace(),
                });
            }
            sets.push(set);
        }
        let plan = merge_children(&sets);
        Ok(ObjectInner {
            header,
            source: ObjectSource::Layered { layers, plan },
            children: RwLock::new(HashMap::new()),
            props: RwLock::new(Weak::new()),
        })
    }

    /// The object header.
    pub fn header(&self) -> &ObjectHeader {
        &self.inner.header
    }

    /// Object name (unique among siblings).
    pub fn name(&self) -> &str {
        &self.inner.header.name
    }

    /// Full path from the root.
    pub fn full_name(&self) -> &str {
        &self.inner.header.full_name
    }

    /// Object metadata.
    pub fn meta_data(&self) -> &MetaData {
        &self.inner.header.meta_data
    }

    /// True if both handles refer to the same live instance.
    pub fn same_instance(&self, other: &IObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of child objects.
    pub fn num_children(&self) -> usize {
        match &self.inner.source {
            ObjectSource::Store { child_names, .. } => child_names.len(),
            ObjectSource::Layered { plan, .. } => plan.len(),
        }
    }

    /// Child names in canonical iteration order.
    pub fn child_names(&self) -> Vec<String> {
        match &self.inner.source {
            ObjectSource::Store { child_names, .. } => child_names.clone(),
            ObjectSource::Layered { plan, .. } => {
                plan.iter().map(|e| e.name.clone()).collect()
            }
        }
    }

    /// Metadata of a child object without constructing it.
    pub(crate) fn child_meta(&self, name: &str) -> Result<Option<MetaData>> {
        match &self.inner.source {
            ObjectSource::Store {
                store,
                node,
                child_names,
                ..
            } => {
                if !child_names.iter().any(|n| n == name) {
                    return Ok(None);
                }
                match store.lookup(*node, name)? {
                    None => Ok(None),
                    Some(child) => Ok(Some(
                        store
                            .attr(child, OBJECT_META_KEY)?
                            .and_then(|v| v.as_str().map(MetaData::parse))
                            .unwrap_or_default(),
                    )),
                }
            }
            ObjectSource::Layered { layers, plan } => {
                match plan.iter().find(|e| e.name == name) {
                    None => Ok(None),
                    Some(entry) => layers[entry.contributors[0]].child_meta(name),
                }
            }
        }
    }

    /// Look up a child object by name.
    ///
    /// While any handle to the child is alive, repeated lookups return
    /// the same instance; once all handles are released the entry may be
    /// collected and a later lookup rebuilds it from the store.
    pub fn child(&self, name: &str) -> Result<IObject> {
        if let Some(existing) = self
            .inner
            .children
            .read()
            .get(name)
            .and_then(|w| w.upgrade())
        {
            return Ok(IObject { inner: existing });
        }

        trace!(path = %join_path(self.full_name(), name), "building child object");
        let built = self.build_child(name)?;

        let mut cache = self.inner.children.write();
        if let Some(existing) = cache.get(name).and_then(|w| w.upgrade()) {
            // lost the construction race; the first published instance wins
            return Ok(IObject { inner: existing });
        }
        let inner = Arc::new(built);
        cache.insert(name.to_string(), Arc::downgrade(&inner));
        Ok(IObject { inner })
    }

    fn build_child(&self, name: &str) -> Result<ObjectInner> {
        let full = join_path(self.full_name(), name);
        match &self.inner.source {
            ObjectSource::Store {
                core,
                store,
                node,
                child_names,
            } => {
                if !child_names.iter().any(|n| n == name) {
                    return Err(Error::ObjectNotFound(full));
                }
                let child_node = store
                    .lookup(*node, name)?
                    .ok_or_else(|| Error::ObjectNotFound(full.clone()))?;
                let meta = store
                    .attr(child_node, OBJECT_META_KEY)?
                    .and_then(|v| v.as_str().map(MetaData::parse))
                    .unwrap_or_default();
                let header = ObjectHeader::new(name, full).with_meta_data(meta);
                Self::store_inner(core.clone(), store.clone(), child_node, header)
            }
            ObjectSource::Layered { layers, plan } => {
                let entry = plan
                    .iter()
                    .find(|e| e.name == name)
                    .ok_or_else(|| Error::ObjectNotFound(full.clone()))?;
                let subs = entry
                    .contributors
                    .iter()
                    .map(|&i| layers[i].child(name))
                    .collect::<Result<Vec<_>>>()?;
                let meta = subs[0].meta_data().clone();
                let header = ObjectHeader::new(name, full).with_meta_data(meta);
                Self::layered_inner(subs, header)
            }
        }
    }

    /// Child object by index, in canonical order.
    pub fn child_at(&self, index: usize) -> Result<IObject> {
        let names = self.child_names();
        let name = names.get(index).ok_or(Error::ChildOutOfBounds {
            index,
            count: names.len(),
        })?;
        self.child(name)
    }

    /// All child objects, in canonical order.
    pub fn children(&self) -> Result<Vec<IObject>> {
        self.child_names()
            .iter()
            .map(|name| self.child(name))
            .collect()
    }

    /// The object's root compound property.
    pub fn properties(&self) -> Result<ICompound> {
        if let Some(existing) = self.inner.props.read().upgrade() {
            return Ok(ICompound::from_inner(existing));
        }
        let built = self.build_properties()?;
        let mut slot = self.inner.props.write();
        if let Some(existing) = slot.upgrade() {
            return Ok(ICompound::from_inner(existing));
        }
        let inner = Arc::new(built);
        *slot = Arc::downgrade(&inner);
        Ok(ICompound::from_inner(inner))
    }

    fn build_properties(&self) -> Result<CompoundInner> {
        let header = PropertyHeader::compound("");
        let path = self.full_name().to_string();
        match &self.inner.source {
            ObjectSource::Store {
                core, store, node, ..
            } => {
                let prop_node = store.lookup(*node, PROPERTIES_NODE)?.ok_or_else(|| {
                    Error::malformed(format!("object '{}' has no property node", path))
                })?;
                CompoundInner::from_store(core.clone(), store.clone(), prop_node, header, path)
            }
            ObjectSource::Layered { layers, .. } => {
                let subs = layers
                    .iter()
                    .map(|l| l.properties())
                    .collect::<Result<Vec<_>>>()?;
                CompoundInner::layered(subs, header, path)
            }
        }
    }

    /// Content digest over this object's properties and children.
    ///
    /// Structurally equal subtrees digest equal; the layering identity
    /// tests rely on this.
    pub fn digest(&self) -> Result<Digest> {
        let mut h = Hasher::new();
        h.update_str(self.name());
        mix_meta(&mut h, self.meta_data());
        h.update_digest(&self.properties()?.digest()?);
        for name in self.child_names() {
            h.update_str(&name);
            h.update_digest(&self.child(&name)?.digest()?);
        }
        Ok(h.finish())
    }

    /// Depth-first walk over this object and all descendants.
    pub fn walk(&self, visit: &mut dyn FnMut(&IObject) -> Result<()>) -> Result<()> {
        visit(self)?;
        for name in self.child_names() {
            self.child(&name)?.walk(visit)?;
        }
        Ok(())
    }
}

// ============================================================================
// OObject
// ============================================================================

/// Writable object builder.
pub struct OObject {
    store: Arc<dyn Store>,
    shared: Arc<RwLock<WriterShared>>,
    node: NodeId,
    prop_node: NodeId,
    header: ObjectHeader,
    closed: bool,
}

impl OObject {
    /// Open a writer over an existing object node, creating its reserved
    /// property node if absent.
    pub(crate) fn open_node(
        store: Arc<dyn Store>,
        shared: Arc<RwLock<WriterShared>>,
        node: NodeId,
        header: ObjectHeader,
    ) -> Result<Self> {
        let prop_node = match store.lookup(node, PROPERTIES_NODE)? {
            Some(id) => id,
            None => store.add_child(node, PROPERTIES_NODE)?,
        };
        Ok(Self {
            store,
            shared,
            node,
            prop_node,
            header,
            closed: false,
        })
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Full path from the root.
    pub fn full_name(&self) -> &str {
        &self.header.full_name
    }

    /// Add a child object. Sibling names must be unique.
    pub fn add_child(&mut self, name: &str, meta: MetaData) -> Result<OObject> {
        if self.closed {
            return Err(Error::Frozen);
        }
        validate_name(name)?;
        let node = self.store.add_child(self.node, name)?;
        self.store
            .set_attr(node, OBJECT_META_KEY, meta.serialize().into())?;
        let header =
            ObjectHeader::new(name, join_path(&self.header.full_name, name)).with_meta_data(meta);
        OObject::open_node(self.store.clone(), self.shared.clone(), node, header)
    }

    /// Writer for the object's root compound property.
    pub fn properties(&mut self) -> OCompound {
        OCompound::new(
            self.store.clone(),
            self.shared.clone(),
            self.prop_node,
            self.header.full_name.clone(),
        )
    }

    /// Close the object: no further structural children are accepted.
    /// Sample appends on already-created property writers stay valid.
    pub fn close(&mut self) {
        self.closed = true;
    }
}
