//! Per-node layer stack resolution.
//!
//! For one tree node, the layering engine needs to know, for every child
//! name, which of the contributing layers feed that child's subtree. The
//! computation here is shared verbatim by object nodes and compound
//! property nodes; only the way flags are collected differs.
//!
//! Layers are ordered highest priority first throughout.

/// One child as seen by one layer: its name and layering flags.
#[derive(Clone, Debug)]
pub(crate) struct ChildFlags {
    pub name: String,
    pub prune: bool,
    pub replace: bool,
}

/// One child of the merged node: its name and the indices of the layers
/// that contribute to its subtree, priority order preserved.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MergedChild {
    pub name: String,
    pub contributors: Vec<usize>,
}

/// Merge the child lists of all contributing layers of one node.
///
/// Child order is the union of names in first-occurrence order, scanning
/// layers by priority. For each name the governing layer is the highest
/// one defining it; a `prune` flag on the governing entry consumes the
/// slot and omits the child. The contributing sublist stops inclusively
/// at the first entry, in priority order, carrying `replace`: a replace
/// boundary hides every lower layer from that subtree while layers above
/// it still union-merge.
pub(crate) fn merge_children(layers: &[Vec<ChildFlags>]) -> Vec<MergedChild> {
    let mut order: Vec<&str> = Vec::new();
    for layer in layers {
        for child in layer {
            if !order.iter().any(|n| *n == child.name) {
                order.push(&child.name);
            }
        }
    }

    let mut merged = Vec::with_capacity(order.len());
    for name in order {
        let defining = layers.iter().enumerate().filter_map(|(i, layer)| {
            layer.iter().find(|c| c.name == name).map(|c| (i, c))
        });

        let mut contributors = Vec::new();
        let mut prune = false;
        for (i, child) in defining {
            if contributors.is_empty() {
                prune = child.prune;
            }
            contributors.push(i);
            if child.replace {
                break;
            }
        }
        if prune || contributors.is_empty() {
            continue;
        }
        merged.push(MergedChild {
            name: name.to_string(),
            contributors,
        });
    }
    merged
}
