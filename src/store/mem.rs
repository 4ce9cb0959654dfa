//! In-memory backend adapter.
//!
//! The reference [`Store`] implementation: a node arena behind one lock.
//! Used by the writers and the test suite; physical containers live
//! outside this crate and implement the same trait.

use parking_lot::RwLock;

use super::{AttrValue, NodeId, Store};
use crate::core::SamplePayload;
use crate::util::{Error, Result};

#[derive(Default)]
struct MemNode {
    children: Vec<(String, NodeId)>,
    attrs: Vec<(String, AttrValue)>,
    samples: Vec<SamplePayload>,
}

/// In-memory store: an arena of nodes keyed by [`NodeId`].
///
/// Node 0 is the root and exists from construction.
pub struct MemStore {
    nodes: RwLock<Vec<MemNode>>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    /// Create a store containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(vec![MemNode::default()]),
        }
    }

    fn check(&self, node: NodeId) -> Result<usize> {
        let idx = node as usize;
        if idx < self.nodes.read().len() {
            Ok(idx)
        } else {
            Err(Error::other(format!("invalid node id {}", node)))
        }
    }
}

impl Store for MemStore {
    fn root(&self) -> NodeId {
        0
    }

    fn children(&self, node: NodeId) -> Result<Vec<String>> {
        let idx = self.check(node)?;
        let nodes = self.nodes.read();
        Ok(nodes[idx].children.iter().map(|(n, _)| n.clone()).collect())
    }

    fn lookup(&self, node: NodeId, name: &str) -> Result<Option<NodeId>> {
        let idx = self.check(node)?;
        let nodes = self.nodes.read();
        Ok(nodes[idx]
            .children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id))
    }

    fn attrs(&self, node: NodeId) -> Result<Vec<(String, AttrValue)>> {
        let idx = self.check(node)?;
        Ok(self.nodes.read()[idx].attrs.clone())
    }

    fn attr(&self, node: NodeId, key: &str) -> Result<Option<AttrValue>> {
        let idx = self.check(node)?;
        let nodes = self.nodes.read();
        Ok(nodes[idx]
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn num_samples(&self, node: NodeId) -> Result<usize> {
        let idx = self.check(node)?;
        Ok(self.nodes.read()[idx].samples.len())
    }

    fn read_sample(&self, node: NodeId, index: usize) -> Result<SamplePayload> {
        let idx = self.check(node)?;
        let nodes = self.nodes.read();
        let samples = &nodes[idx].samples;
        samples.get(index).cloned().ok_or(Error::SampleOutOfBounds {
            index,
            count: samples.len(),
        })
    }

    fn add_child(&self, node: NodeId, name: &str) -> Result<NodeId> {
        let idx = self.check(node)?;
        let mut nodes = self.nodes.write();
        if nodes[idx].children.iter().any(|(n, _)| n == name) {
            return Err(Error::WriteFailed(format!(
                "child '{}' already exists",
                name
            )));
        }
        let id = nodes.len() as NodeId;
        nodes.push(MemNode::default());
        nodes[idx].children.push((name.to_string(), id));
        Ok(id)
    }

    fn set_attr(&self, node: NodeId, key: &str, value: AttrValue) -> Result<()> {
        let idx = self.check(node)?;
        let mut nodes = self.nodes.write();
        let attrs = &mut nodes[idx].attrs;
        match attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => attrs.push((key.to_string(), value)),
        }
        Ok(())
    }

    fn append_sample(&self, node: NodeId, payload: &SamplePayload) -> Result<()> {
        let idx = self.check(node)?;
        self.nodes.write()[idx].samples.push(payload.clone());
        Ok(())
    }
}
