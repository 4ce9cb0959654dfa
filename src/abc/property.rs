//! Properties - Scalar, Array and Compound typed data nodes.
//!
//! Dispatch over the three kinds is a tagged enum ([`IProperty`]);
//! downstream code matches on the tag instead of downcasting. Compound
//! readers own their child header directory and build children lazily
//! behind a weak-backed cache, exactly like objects.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use crate::core::{
    Digest, Hasher, MetaData, PropertyHeader, PropertyType, SamplePayload, SampleSelector,
    TimeSampling,
};
use crate::layer::stack::{merge_children, ChildFlags, MergedChild};
use crate::store::{codec, dir, NodeId, Store};
use crate::util::{Chrono, Dimensions, Error, Result, StrataPod};

use super::archive::{ArchiveCore, WriterShared};
use super::object::{join_path, validate_name};

/// Mix metadata into a digest in canonical (key-sorted) order, so that
/// equal metadata bags digest equal regardless of insertion order.
pub(crate) fn mix_meta(h: &mut Hasher, meta: &MetaData) {
    let mut pairs: Vec<(&str, &str)> = meta.iter().collect();
    pairs.sort_unstable();
    for (k, v) in pairs {
        h.update_str(k);
        h.update_str(v);
    }
}

/// Verify that `T` matches a property's declared POD kind.
fn check_pod<T: StrataPod>(header: &PropertyHeader) -> Result<()> {
    if header.data_type.pod != T::POD_TYPE {
        return Err(Error::TypeMismatch {
            expected: header.data_type.to_string(),
            actual: T::POD_TYPE.name().to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// IProperty - tagged dispatch
// ============================================================================

/// A property of any kind, tagged by kind.
#[derive(Clone)]
pub enum IProperty {
    Scalar(IScalar),
    Array(IArray),
    Compound(ICompound),
}

impl IProperty {
    /// The property header.
    pub fn header(&self) -> &PropertyHeader {
        match self {
            Self::Scalar(p) => p.header(),
            Self::Array(p) => p.header(),
            Self::Compound(p) => p.header(),
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.header().name
    }

    /// Property kind.
    pub fn kind(&self) -> PropertyType {
        self.header().property_type
    }

    /// Borrow as scalar, if that is the kind.
    pub fn as_scalar(&self) -> Option<&IScalar> {
        match self {
            Self::Scalar(p) => Some(p),
            _ => None,
        }
    }

    /// Borrow as array, if that is the kind.
    pub fn as_array(&self) -> Option<&IArray> {
        match self {
            Self::Array(p) => Some(p),
            _ => None,
        }
    }

    /// Borrow as compound, if that is the kind.
    pub fn as_compound(&self) -> Option<&ICompound> {
        match self {
            Self::Compound(p) => Some(p),
            _ => None,
        }
    }
}

// ============================================================================
// Leaf properties (Scalar / Array)
// ============================================================================

/// Shared state of a leaf (Scalar/Array) property reader. Leaves are
/// always backed by a single store node: under layering, the governing
/// layer supplies the whole property.
pub(crate) struct LeafInner {
    header: PropertyHeader,
    path: String,
    core: Arc<ArchiveCore>,
    store: Arc<dyn Store>,
    node: NodeId,
}

impl LeafInner {
    fn num_samples(&self) -> Result<usize> {
        self.store.num_samples(self.node)
    }

    fn get(&self, index: usize) -> Result<SamplePayload> {
        self.store.read_sample(self.node, index)
    }

    fn time_sampling(&self) -> Result<TimeSampling> {
        self.core
            .time_sampling(self.header.time_sampling_index)
            .cloned()
    }

    fn sample_time(&self, index: usize) -> Result<Chrono> {
        self.time_sampling()?.sample_time(index)
    }

    fn resolve(&self, selector: SampleSelector) -> Result<usize> {
        Ok(selector.resolve(&self.time_sampling()?, self.num_samples()?))
    }

    fn is_constant(&self) -> Result<bool> {
        let count = self.num_samples()?;
        if count <= 1 {
            return Ok(true);
        }
        let first = self.get(0)?;
        for index in 1..count {
            if self.get(index)? != first {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Content digest: element type, resolved sampling, every sample's
    /// shape and bytes.
    fn digest(&self) -> Result<Digest> {
        let mut h = Hasher::new();
        h.update_str(&self.header.data_type.to_string());
        let mut ts_buf = Vec::new();
        codec::encode_sampling_body(&self.time_sampling()?, &mut ts_buf);
        h.update(&ts_buf);
        let count = self.num_samples()?;
        h.update_u64(count as u64);
        for index in 0..count {
            let sample = self.get(index)?;
            h.update_u64(sample.dimensions.rank() as u64);
            for &d in sample.dimensions.sizes() {
                h.update_u64(d as u64);
            }
            h.update(&sample.data);
        }
        Ok(h.finish())
    }
}

/// Read-only scalar property: one fixed-extent value per sample.
#[derive(Clone)]
pub struct IScalar {
    inner: Arc<LeafInner>,
}

impl IScalar {
    /// The property header.
    pub fn header(&self) -> &PropertyHeader {
        &self.inner.header
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.inner.header.name
    }

    /// Full path of this property.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// True if both handles refer to the same live instance.
    pub fn same_instance(&self, other: &IScalar) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of samples written.
    pub fn num_samples(&self) -> Result<usize> {
        self.inner.num_samples()
    }

    /// Raw sample payload by index.
    pub fn get(&self, index: usize) -> Result<SamplePayload> {
        self.inner.get(index)
    }

    /// Sample resolved through a selector (index or time).
    pub fn sample_by(&self, selector: SampleSelector) -> Result<SamplePayload> {
        self.get(self.inner.resolve(selector)?)
    }

    /// Typed sample value for extent-1 properties.
    pub fn read_typed<T: StrataPod>(&self, index: usize) -> Result<T> {
        check_pod::<T>(&self.inner.header)?;
        if self.inner.header.data_type.extent != 1 {
            return Err(Error::TypeMismatch {
                expected: self.inner.header.data_type.to_string(),
                actual: T::POD_TYPE.name().to_string(),
            });
        }
        let sample = self.get(index)?;
        if sample.data.len() != T::SIZE {
            return Err(Error::malformed(format!(
                "scalar sample at '{}' is {} bytes, expected {}",
                self.inner.path,
                sample.data.len(),
                T::SIZE
            )));
        }
        Ok(bytemuck::pod_read_unaligned(&sample.data))
    }

    /// Typed sample elements (all `extent` PODs of one sample).
    pub fn read_pods<T: StrataPod>(&self, index: usize) -> Result<Vec<T>> {
        check_pod::<T>(&self.inner.header)?;
        let extent = self.inner.header.data_type.extent as usize;
        let sample = self.get(index)?;
        if sample.data.len() != extent * T::SIZE {
            return Err(Error::malformed(format!(
                "scalar sample at '{}' is {} bytes, expected {}",
                self.inner.path,
                sample.data.len(),
                extent * T::SIZE
            )));
        }
        Ok(sample
            .data
            .chunks_exact(T::SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// String sample for string-typed scalars.
    pub fn read_str(&self, index: usize) -> Result<String> {
        if !self.inner.header.data_type.pod.is_string() {
            return Err(Error::TypeMismatch {
                expected: self.inner.header.data_type.to_string(),
                actual: "string".into(),
            });
        }
        let sample = self.get(index)?;
        String::from_utf8(sample.data.to_vec())
            .map_err(|e| Error::malformed(format!("invalid UTF-8 in '{}': {}", self.inner.path, e)))
    }

    /// True iff every sample is bit-equal to the first. A hint, not the
    /// canonical equality definition.
    pub fn is_constant(&self) -> Result<bool> {
        self.inner.is_constant()
    }

    /// The property's resolved time sampling.
    pub fn time_sampling(&self) -> Result<TimeSampling> {
        self.inner.time_sampling()
    }

    /// Time of one sample.
    pub fn sample_time(&self, index: usize) -> Result<Chrono> {
        self.inner.sample_time(index)
    }

    /// Content digest of this property.
    pub fn digest(&self) -> Result<Digest> {
        self.inner.digest()
    }
}

/// Read-only array property: a variable-length homogeneous buffer per
/// sample.
#[derive(Clone)]
pub struct IArray {
    inner: Arc<LeafInner>,
}

impl IArray {
    /// The property header.
    pub fn header(&self) -> &PropertyHeader {
        &self.inner.header
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.inner.header.name
    }

    /// Full path of this property.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// True if both handles refer to the same live instance.
    pub fn same_instance(&self, other: &IArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of samples written.
    pub fn num_samples(&self) -> Result<usize> {
        self.inner.num_samples()
    }

    /// Raw sample payload by index.
    pub fn get(&self, index: usize) -> Result<SamplePayload> {
        self.inner.get(index)
    }

    /// Sample resolved through a selector (index or time).
    pub fn sample_by(&self, selector: SampleSelector) -> Result<SamplePayload> {
        self.get(self.inner.resolve(selector)?)
    }

    /// Shape of one sample.
    pub fn sample_dimensions(&self, index: usize) -> Result<Dimensions> {
        Ok(self.get(index)?.dimensions)
    }

    /// Element count of one sample.
    pub fn sample_len(&self, index: usize) -> Result<usize> {
        Ok(self.get(index)?.num_points())
    }

    /// Typed sample elements. For extent > 1 the PODs of each element are
    /// returned flattened, `extent` per element.
    pub fn read_typed<T: StrataPod>(&self, index: usize) -> Result<Vec<T>> {
        check_pod::<T>(&self.inner.header)?;
        let sample = self.get(index)?;
        if sample.data.len() % T::SIZE != 0 {
            return Err(Error::malformed(format!(
                "array sample at '{}' is {} bytes, not a multiple of {}",
                self.inner.path,
                sample.data.len(),
                T::SIZE
            )));
        }
        Ok(sample
            .data
            .chunks_exact(T::SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// f32 view of one sample.
    pub fn read_f32s(&self, index: usize) -> Result<Vec<f32>> {
        self.read_typed::<f32>(index)
    }

    /// i32 view of one sample.
    pub fn read_i32s(&self, index: usize) -> Result<Vec<i32>> {
        self.read_typed::<i32>(index)
    }

    /// String-array view: the payload is concatenated NUL-terminated
    /// UTF-8 strings.
    pub fn read_strings(&self, index: usize) -> Result<Vec<String>> {
        if !self.inner.header.data_type.pod.is_string() {
            return Err(Error::TypeMismatch {
                expected: self.inner.header.data_type.to_string(),
                actual: "string".into(),
            });
        }
        let sample = self.get(index)?;
        let mut strings = Vec::new();
        for piece in sample.data.split(|&b| b == 0) {
            if piece.is_empty() {
                continue;
            }
            let s = std::str::from_utf8(piece).map_err(|e| {
                Error::malformed(format!("invalid UTF-8 in '{}': {}", self.inner.path, e))
            })?;
            strings.push(s.to_string());
        }
        Ok(strings)
    }

    /// True iff every sample is bit-equal to the first (shape included).
    pub fn is_constant(&self) -> Result<bool> {
        self.inner.is_constant()
    }

    /// The property's resolved time sampling.
    pub fn time_sampling(&self) -> Result<TimeSampling> {
        self.inner.time_sampling()
    }

    /// Time of one sample.
    pub fn sample_time(&self, index: usize) -> Result<Chrono> {
        self.inner.sample_time(index)
    }

    /// Content digest of this property.
    pub fn digest(&self) -> Result<Digest> {
        self.inner.digest()
    }
}

// ============================================================================
// ICompound
// ============================================================================

enum WeakProperty {
    Leaf(Weak<LeafInner>),
    Compound(Weak<CompoundInner>),
}

pub(crate) enum CompoundSource {
    /// Backed by a store node of one physical archive.
    Store {
        core: Arc<ArchiveCore>,
        store: Arc<dyn Store>,
        node: NodeId,
    },
    /// Overlay of the same path across several layers, priority first.
    Layered {
        layers: Vec<ICompound>,
        plan: Vec<MergedChild>,
    },
}

pub(crate) struct CompoundInner {
    header: PropertyHeader,
    path: String,
    source: CompoundSource,
    /// Ordered child directory; the compound exclusively owns it.
    headers: Vec<PropertyHeader>,
    cache: RwLock<HashMap<String, WeakProperty>>,
}

impl CompoundInner {
    /// Build over a store node, decoding the attribute directory.
    pub(crate) fn from_store(
        core: Arc<ArchiveCore>,
        store: Arc<dyn Store>,
        node: NodeId,
        header: PropertyHeader,
        path: String,
    ) -> Result<Self> {
        let headers = dir::decode_directory(&store.attrs(node)?)?;
        Ok(Self {
            header,
            path,
            source: CompoundSource::Store { core, store, node },
            headers,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Build an overlay over the same compound path in several layers.
    ///
    /// Fails with [`Error::LayerTypeConflict`] if a child name maps to a
    /// compound in one effective layer and a leaf in another.
    pub(crate) fn layered(
        layers: Vec<ICompound>,
        header: PropertyHeader,
        path: String,
    ) -> Result<Self> {
        let sets: Vec<Vec<ChildFlags>> = layers
            .iter()
            .map(|layer| {
                layer
                    .inner
                    .headers
                    .iter()
                    .map(|h| ChildFlags {
                        name: h.name.clone(),
                        prune: h.meta_data.is_prune(),
                        replace: h.meta_data.is_replace(),
                    })
                    .collect()
            })
            .collect();
        let plan = merge_children(&sets);

        let mut headers = Vec::with_capacity(plan.len());
        for entry in &plan {
            let contributing: Vec<&PropertyHeader> = entry
                .contributors
                .iter()
                .filter_map(|&i| layers[i].header_by_name(&entry.name))
                .collect();
            let governing = contributing[0];
            let compounds = contributing.iter().filter(|h| h.is_compound()).count();
            if compounds != 0 && compounds != contributing.len() {
                return Err(Error::LayerTypeConflict {
                    path: join_path(&path, &entry.name),
                    detail: "compound in one layer, leaf property in another".into(),
                });
            }
            headers.push(governing.clone());
        }

        Ok(Self {
            header,
            path,
            source: CompoundSource::Layered { layers, plan },
            headers,
            cache: RwLock::new(HashMap::new()),
        })
    }
}

/// Read-only compound property: an ordered directory of child properties.
#[derive(Clone)]
pub struct ICompound {
    inner: Arc<CompoundInner>,
}

impl ICompound {
    pub(crate) fn from_inner(inner: Arc<CompoundInner>) -> Self {
        Self { inner }
    }

    /// The property header.
    pub fn header(&self) -> &PropertyHeader {
        &self.inner.header
    }

    /// Property name (empty for an object's root compound).
    pub fn name(&self) -> &str {
        &self.inner.header.name
    }

    /// Full path of this compound.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// True if both handles refer to the same live instance.
    pub fn same_instance(&self, other: &ICompound) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of child properties.
    pub fn num_properties(&self) -> usize {
        self.inner.headers.len()
    }

    /// The ordered child header directory.
    pub fn property_headers(&self) -> &[PropertyHeader] {
        &self.inner.headers
    }

    /// Child header by index.
    pub fn header_at(&self, index: usize) -> Result<&PropertyHeader> {
        self.inner.headers.get(index).ok_or(Error::ChildOutOfBounds {
            index,
            count: self.inner.headers.len(),
        })
    }

    /// Child header by name.
    pub fn header_by_name(&self, name: &str) -> Option<&PropertyHeader> {
        self.inner.headers.iter().find(|h| h.name == name)
    }

    /// Check if a child property exists.
    pub fn has_property(&self, name: &str) -> bool {
        self.header_by_name(name).is_some()
    }

    /// Child property names in directory order.
    pub fn property_names(&self) -> Vec<String> {
        self.inner.headers.iter().map(|h| h.name.clone()).collect()
    }

    /// Look up a child property by name, tagged by kind.
    ///
    /// Same instance-caching contract as object children.
    pub fn property(&self, name: &str) -> Result<IProperty> {
        let header = self
            .header_by_name(name)
            .ok_or_else(|| Error::PropertyNotFound(join_path(&self.inner.path, name)))?
            .clone();

        if let Some(existing) = self.cached(name, &header) {
            return Ok(existing);
        }

        trace!(path = %join_path(&self.inner.path, name), "building child property");
        let built = self.build(name, &header)?;

        let mut cache = self.inner.cache.write();
        if let Some(existing) = self.cached_locked(&cache, name, &header) {
            return Ok(existing);
        }
        match &built {
            IProperty::Scalar(p) => {
                cache.insert(name.to_string(), WeakProperty::Leaf(Arc::downgrade(&p.inner)));
            }
            IProperty::Array(p) => {
                cache.insert(name.to_string(), WeakProperty::Leaf(Arc::downgrade(&p.inner)));
            }
            IProperty::Compound(p) => {
                cache.insert(
                    name.to_string(),
                    WeakProperty::Compound(Arc::downgrade(&p.inner)),
                );
            }
        }
        Ok(built)
    }

    fn cached(&self, name: &str, header: &PropertyHeader) -> Option<IProperty> {
        let cache = self.inner.cache.read();
        self.cached_locked(&cache, name, header)
    }

    fn cached_locked(
        &self,
        cache: &HashMap<String, WeakProperty>,
        name: &str,
        header: &PropertyHeader,
    ) -> Option<IProperty> {
        match cache.get(name)? {
            WeakProperty::Leaf(w) => {
                let inner = w.upgrade()?;
                Some(match header.property_type {
                    PropertyType::Array => IProperty::Array(IArray { inner }),
                    _ => IProperty::Scalar(IScalar { inner }),
                })
            }
            WeakProperty::Compound(w) => {
                Some(IProperty::Compound(ICompound { inner: w.upgrade()? }))
            }
        }
    }

    fn build(&self, name: &str, header: &PropertyHeader) -> Result<IProperty> {
        let child_path = join_path(&self.inner.path, name);
        match &self.inner.source {
            CompoundSource::Store { core, store, node } => {
                let child_node = store.lookup(*node, name)?.ok_or_else(|| {
                    Error::malformed(format!("property '{}' has no store node", child_path))
                })?;
                match header.property_type {
                    PropertyType::Compound => {
                        let inner = CompoundInner::from_store(
                            core.clone(),
                            store.clone(),
                            child_node,
                            header.clone(),
                            child_path,
                        )?;
                        Ok(IProperty::Compound(ICompound {
                            inner: Arc::new(inner),
                        }))
                    }
                    kind => {
                        let inner = Arc::new(LeafInner {
                            header: header.clone(),
                            path: child_path,
                            core: core.clone(),
                            store: store.clone(),
                            node: child_node,
                        });
                        Ok(match kind {
                            PropertyType::Array => IProperty::Array(IArray { inner }),
                            _ => IProperty::Scalar(IScalar { inner }),
                        })
                    }
                }
            }
            CompoundSource::Layered { layers, plan } => {
                let entry = plan
                    .iter()
                    .find(|e| e.name == name)
                    .ok_or_else(|| Error::PropertyNotFound(child_path.clone()))?;
                if header.is_compound() {
                    let subs = entry
                        .contributors
                        .iter()
                        .map(|&i| layers[i].compound(name))
                        .collect::<Result<Vec<_>>>()?;
                    let inner =
                        CompoundInner::layered(subs, header.clone(), child_path)?;
                    Ok(IProperty::Compound(ICompound {
                        inner: Arc::new(inner),
                    }))
                } else {
                    // Leaf rule: the governing layer supplies the whole
                    // property, lower definitions are ignored outright.
                    layers[entry.contributors[0]].property(name)
                }
            }
        }
    }

    /// Child scalar property; [`Error::TypeMismatch`] for other kinds.
    pub fn scalar(&self, name: &str) -> Result<IScalar> {
        match self.property(name)? {
            IProperty::Scalar(p) => Ok(p),
            other => Err(Error::TypeMismatch {
                expected: PropertyType::Scalar.name().into(),
                actual: other.kind().name().into(),
            }),
        }
    }

    /// Child array property; [`Error::TypeMismatch`] for other kinds.
    pub fn array(&self, name: &str) -> Result<IArray> {
        match self.property(name)? {
            IProperty::Array(p) => Ok(p),
            other => Err(Error::TypeMismatch {
                expected: PropertyType::Array.name().into(),
                actual: other.kind().name().into(),
            }),
        }
    }

    /// Child compound property; [`Error::TypeMismatch`] for other kinds.
    pub fn compound(&self, name: &str) -> Result<ICompound> {
        match self.property(name)? {
            IProperty::Compound(p) => Ok(p),
            other => Err(Error::TypeMismatch {
                expected: PropertyType::Compound.name().into(),
                actual: other.kind().name().into(),
            }),
        }
    }

    /// Content digest over the directory and every child, recursively.
    pub fn digest(&self) -> Result<Digest> {
        let mut h = Hasher::new();
        for header in &self.inner.headers {
            h.update_str(&header.name);
            h.update_str(header.property_type.name());
            mix_meta(&mut h, &header.meta_data);
            let child_digest = match self.property(&header.name)? {
                IProperty::Scalar(p) => p.digest()?,
                IProperty::Array(p) => p.digest()?,
                IProperty::Compound(p) => p.digest()?,
            };
            h.update_digest(&child_digest);
        }
        Ok(h.finish())
    }
}

// ============================================================================
// Property writers
// ============================================================================

fn note_samples(shared: &RwLock<WriterShared>, ts_index: u32, count: usize) {
    let mut shared = shared.write();
    if let Some(slot) = shared.max_samples.get_mut(ts_index as usize) {
        *slot = (*slot).max(count as u32);
    }
}

/// Writable compound property builder.
pub struct OCompound {
    store: Arc<dyn Store>,
    shared: Arc<RwLock<WriterShared>>,
    node: NodeId,
    path: String,
    closed: bool,
}

impl OCompound {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        shared: Arc<RwLock<WriterShared>>,
        node: NodeId,
        path: String,
    ) -> Self {
        Self {
            store,
            shared,
            node,
            path,
            closed: false,
        }
    }

    /// Full path of this compound.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Publish a child's directory keys and create its node.
    fn add_node(&mut self, header: &PropertyHeader) -> Result<NodeId> {
        if self.closed {
            return Err(Error::Frozen);
        }
        validate_name(&header.name)?;
        if header.property_type != PropertyType::Compound {
            if !header.data_type.is_valid() {
                return Err(Error::WriteFailed(format!(
                    "property '{}' has an invalid data type",
                    header.name
                )));
            }
            let shared = self.shared.read();
            let index = header.time_sampling_index as usize;
            if index >= shared.samplings.len() {
                return Err(Error::TimeSamplingOutOfBounds {
                    index,
                    count: shared.samplings.len(),
                });
            }
        }
        let info_key = format!("{}.{}", header.name, dir::INFO_SUFFIX);
        if self.store.attr(self.node, &info_key)?.is_some() {
            return Err(Error::WriteFailed(format!(
                "property '{}' already exists",
                header.name
            )));
        }
        for (key, value) in dir::encode_header(header) {
            self.store.set_attr(self.node, &key, value)?;
        }
        self.store.add_child(self.node, &header.name)
    }

    /// Add a scalar property.
    pub fn add_scalar(&mut self, header: PropertyHeader) -> Result<OScalar> {
        if !header.is_scalar() {
            return Err(Error::TypeMismatch {
                expected: PropertyType::Scalar.name().into(),
                actual: header.property_type.name().into(),
            });
        }
        let node = self.add_node(&header)?;
        Ok(OScalar {
            store: self.store.clone(),
            shared: self.shared.clone(),
            node,
            header,
        })
    }

    /// Add an array property.
    pub fn add_array(&mut self, header: PropertyHeader) -> Result<OArray> {
        if !header.is_array() {
            return Err(Error::TypeMismatch {
                expected: PropertyType::Array.name().into(),
                actual: header.property_type.name().into(),
            });
        }
        let node = self.add_node(&header)?;
        Ok(OArray {
            store: self.store.clone(),
            shared: self.shared.clone(),
            node,
            header,
        })
    }

    /// Add a nested compound property.
    pub fn add_compound(&mut self, header: PropertyHeader) -> Result<OCompound> {
        if !header.is_compound() {
            return Err(Error::TypeMismatch {
                expected: PropertyType::Compound.name().into(),
                actual: header.property_type.name().into(),
            });
        }
        let path = join_path(&self.path, &header.name);
        let node = self.add_node(&header)?;
        Ok(OCompound::new(
            self.store.clone(),
            self.shared.clone(),
            node,
            path,
        ))
    }

    /// Close the compound: no further children are accepted.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

/// Writable scalar property. Samples are appended in increasing index
/// order and never rewritten.
pub struct OScalar {
    store: Arc<dyn Store>,
    shared: Arc<RwLock<WriterShared>>,
    node: NodeId,
    header: PropertyHeader,
}

impl OScalar {
    /// The property header.
    pub fn header(&self) -> &PropertyHeader {
        &self.header
    }

    /// Number of samples appended so far.
    pub fn num_samples(&self) -> Result<usize> {
        self.store.num_samples(self.node)
    }

    /// Append one sample from raw bytes. Must be exactly one element of
    /// the declared data type (strings are variable-length).
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        let data_type = self.header.data_type;
        if !data_type.pod.is_string() && data.len() != data_type.num_bytes() {
            return Err(Error::WriteFailed(format!(
                "scalar sample is {} bytes, expected {} ({})",
                data.len(),
                data_type.num_bytes(),
                data_type
            )));
        }
        self.store
            .append_sample(self.node, &SamplePayload::scalar(data.to_vec()))?;
        let count = self.store.num_samples(self.node)?;
        note_samples(&self.shared, self.header.time_sampling_index, count);
        Ok(())
    }

    /// Append a typed extent-1 sample.
    pub fn append_typed<T: StrataPod>(&mut self, value: &T) -> Result<()> {
        check_pod::<T>(&self.header)?;
        if self.header.data_type.extent != 1 {
            return Err(Error::TypeMismatch {
                expected: self.header.data_type.to_string(),
                actual: T::POD_TYPE.name().to_string(),
            });
        }
        self.append(bytemuck::bytes_of(value))
    }

    /// Append a typed sample of `extent` PODs.
    pub fn append_pods<T: StrataPod>(&mut self, values: &[T]) -> Result<()> {
        check_pod::<T>(&self.header)?;
        if values.len() != self.header.data_type.extent as usize {
            return Err(Error::WriteFailed(format!(
                "scalar sample has {} elements, expected {}",
                values.len(),
                self.header.data_type.extent
            )));
        }
        self.append(bytemuck::cast_slice(values))
    }

    /// Append a string sample for string-typed scalars.
    pub fn append_str(&mut self, value: &str) -> Result<()> {
        if !self.header.data_type.pod.is_string() {
            return Err(Error::TypeMismatch {
                expected: self.header.data_type.to_string(),
                actual: "string".into(),
            });
        }
        self.append(value.as_bytes())
    }

    /// Duplicate the last sample (sparse encoding of constant stretches).
    pub fn append_from_previous(&mut self) -> Result<()> {
        let count = self.store.num_samples(self.node)?;
        if count == 0 {
            return Err(Error::SampleOutOfBounds { index: 0, count: 0 });
        }
        let prev = self.store.read_sample(self.node, count - 1)?;
        self.store.append_sample(self.node, &prev)?;
        note_samples(&self.shared, self.header.time_sampling_index, count + 1);
        Ok(())
    }
}

/// Writable array property.
pub struct OArray {
    store: Arc<dyn Store>,
    shared: Arc<RwLock<WriterShared>>,
    node: NodeId,
    header: PropertyHeader,
}

impl OArray {
    /// The property header.
    pub fn header(&self) -> &PropertyHeader {
        &self.header
    }

    /// Number of samples appended so far.
    pub fn num_samples(&self) -> Result<usize> {
        self.store.num_samples(self.node)
    }

    /// Append one sample from raw bytes with an explicit shape.
    pub fn append(&mut self, data: &[u8], dimensions: Dimensions) -> Result<()> {
        let data_type = self.header.data_type;
        let expected = dimensions.num_points() * data_type.num_bytes();
        if !data_type.pod.is_string() && data.len() != expected {
            return Err(Error::WriteFailed(format!(
                "array sample is {} bytes, expected {} for {} x {}",
                data.len(),
                expected,
                dimensions,
                data_type
            )));
        }
        self.store
            .append_sample(self.node, &SamplePayload::new(data.to_vec(), dimensions))?;
        let count = self.store.num_samples(self.node)?;
        note_samples(&self.shared, self.header.time_sampling_index, count);
        Ok(())
    }

    /// Append a flat typed sample; the shape becomes 1D with
    /// `values.len() / extent` elements.
    pub fn append_typed<T: StrataPod>(&mut self, values: &[T]) -> Result<()> {
        check_pod::<T>(&self.header)?;
        let extent = self.header.data_type.extent as usize;
        if values.len() % extent != 0 {
            return Err(Error::WriteFailed(format!(
                "array sample has {} PODs, not a multiple of extent {}",
                values.len(),
                extent
            )));
        }
        self.append(
            bytemuck::cast_slice(values),
            Dimensions::d1(values.len() / extent),
        )
    }

    /// Append a string-array sample (concatenated NUL-terminated UTF-8).
    pub fn append_strings(&mut self, values: &[&str]) -> Result<()> {
        if !self.header.data_type.pod.is_string() {
            return Err(Error::TypeMismatch {
                expected: self.header.data_type.to_string(),
                actual: "string".into(),
            });
        }
        let mut data = Vec::new();
        for v in values {
            data.extend_from_slice(v.as_bytes());
            data.push(0);
        }
        self.append(&data, Dimensions::d1(values.len()))
    }

    /// Duplicate the last sample (sparse encoding of constant stretches).
    pub fn append_from_previous(&mut self) -> Result<()> {
        let count = self.store.num_samples(self.node)?;
        if count == 0 {
            return Err(Error::SampleOutOfBounds { index: 0, count: 0 });
        }
        let prev = self.store.read_sample(self.node, count - 1)?;
        self.store.append_sample(self.node, &prev)?;
        note_samples(&self.shared, self.header.time_sampling_index, count + 1);
        Ok(())
    }
}
