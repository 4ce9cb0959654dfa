//! Layering - compose several archives into one virtual archive.
//!
//! [`compose`] takes archives ordered **highest priority first** and
//! produces a read-only archive whose tree is the overlay of all inputs.
//! The merge is a pure tree walk over the abstract object model: no
//! sample bytes are copied and child resolution stays lazy.
//!
//! Per node, child names union-merge in first-occurrence priority order.
//! Two metadata flags steer the merge at any depth:
//!
//! - **prune** deletes the child (and its whole subtree) from the result;
//! - **replace** discards every layer below the flagged one for that
//!   subtree, so its content comes from the flagged layer union-merged
//!   only with layers above it.
//!
//! A leaf (Scalar/Array) property defined in several layers is taken
//! wholesale from the highest-priority layer that defines it; there is no
//! per-sample merging. A name mapping to a compound in one layer and a
//! leaf in another fails the merge with [`Error::LayerTypeConflict`],
//! leaving every input archive valid and usable on its own.

pub(crate) mod stack;

use std::sync::Arc;

use tracing::debug;

use crate::abc::{ArchiveCore, IArchive, IObject};
use crate::core::{MetaData, ObjectHeader, TimeSampling};
use crate::util::{Error, Result};

/// Compose archives, highest priority first, into one virtual archive.
///
/// With a single input the result reproduces that archive's tree exactly
/// (equal content digests). The composed archive's registry is the
/// deduplicated union of the input registries; properties keep resolving
/// time queries against their own source archive.
pub fn compose(layers: Vec<IArchive>) -> Result<IArchive> {
    if layers.is_empty() {
        return Err(Error::other("compose requires at least one input archive"));
    }
    debug!(layers = layers.len(), "composing archives");

    // Deduplicated union of the input registries.
    let mut samplings: Vec<TimeSampling> = Vec::new();
    let mut max_samples: Vec<u32> = Vec::new();
    for archive in &layers {
        for index in 0..archive.num_time_samplings() {
            let Some(sampling) = archive.time_sampling(index) else {
                continue;
            };
            let max = archive
                .max_num_samples_for_time_sampling(index)
                .unwrap_or(0) as u32;
            match samplings.iter().position(|s| s == sampling) {
                Some(existing) => max_samples[existing] = max_samples[existing].max(max),
                None => {
                    samplings.push(sampling.clone());
                    max_samples.push(max);
                }
            }
        }
    }

    // Archive metadata: per-key override, higher priority wins.
    let mut meta = MetaData::new();
    for archive in layers.iter().rev() {
        for (k, v) in archive.meta_data().iter() {
            meta.set(k, v);
        }
    }

    let name = format!(
        "composed({})",
        layers
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // The root itself obeys the replace boundary rule like any node.
    let mut roots = Vec::new();
    for archive in &layers {
        let root = archive.root().clone();
        let replace = root.meta_data().is_replace();
        roots.push(root);
        if replace {
            break;
        }
    }
    let root_meta = roots[0].meta_data().clone();
    let header = ObjectHeader::new("", "").with_meta_data(root_meta);
    let root = IObject::layered(roots, header)?;

    let core = Arc::new(ArchiveCore {
        name,
        meta,
        samplings,
        max_samples,
    });
    Ok(IArchive::from_parts(core, root))
}
