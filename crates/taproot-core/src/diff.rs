//! Snapshot-to-snapshot differences, used to summarize rebuilds

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::snapshot::Snapshot;

/// What changed between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub from_version: u64,
    pub to_version: u64,
    /// Nodes added in the newer snapshot.
    pub added_nodes: Vec<NodeId>,
    /// Nodes no longer present.
    pub removed_nodes: Vec<NodeId>,
    /// Nodes present in both whose content differs.
    pub modified_nodes: Vec<NodeId>,
    pub added_links: Vec<Link>,
    pub removed_links: Vec<Link>,
}

type LinkKey = (NodeId, NodeId, Relation);

impl SnapshotDiff {
    pub fn between(old: &Snapshot, new: &Snapshot) -> Self {
        let old_store = old.store();
        let new_store = new.store();
        let mut diff = SnapshotDiff {
            from_version: old.version(),
            to_version: new.version(),
            ..SnapshotDiff::default()
        };

        let mut seen = BTreeSet::new();
        for node in new_store.nodes() {
            seen.insert(node.id);
            match old_store.get_node(node.id) {
                Ok(previous) if previous == node => {}
                Ok(_) => diff.modified_nodes.push(node.id),
                Err(_) => diff.added_nodes.push(node.id),
            }
        }
        diff.removed_nodes = old_store
            .nodes()
            .map(|node| node.id)
            .filter(|id| !seen.contains(id))
            .collect();

        let key = |link: &Link| -> LinkKey { (link.from, link.to, link.relation) };
        let old_links: HashSet<LinkKey> = old_store.links().map(key).collect();
        let new_links: HashSet<LinkKey> = new_store.links().map(key).collect();
        diff.added_links = new_store
            .links()
            .filter(|link| !old_links.contains(&key(link)))
            .cloned()
            .collect();
        diff.removed_links = old_store
            .links()
            .filter(|link| !new_links.contains(&key(link)))
            .cloned()
            .collect();

        diff.added_nodes.sort();
        diff.removed_nodes.sort();
        diff.modified_nodes.sort();
        diff
    }

    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.modified_nodes.is_empty()
            && self.added_links.is_empty()
            && self.removed_links.is_empty()
    }

    /// Every node touched by the diff, including link endpoints.
    pub fn touched_nodes(&self) -> BTreeSet<NodeId> {
        let mut touched: BTreeSet<NodeId> = self
            .added_nodes
            .iter()
            .chain(&self.removed_nodes)
            .chain(&self.modified_nodes)
            .copied()
            .collect();
        for link in self.added_links.iter().chain(&self.removed_links) {
            touched.insert(link.from);
        }
        touched
    }
}
