//! Graph store using petgraph::StableDiGraph keyed by path-derived NodeIds

use std::collections::{BTreeSet, HashMap};
use std::collections::hash_map::Entry;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;

use crate::error::{Error, Result};
use crate::model::*;
use crate::snapshot::Snapshot;

/// The dependency graph: a directed multigraph of nodes and links with
/// id and path lookup.
///
/// Mutable while a build assembles it; once turned into a [`Snapshot`] it is
/// only ever read.
pub struct GraphStore {
    inner: StableDiGraph<Node, Link>,
    by_id: HashMap<NodeId, NodeIndex>,
    by_path: HashMap<String, NodeId>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("node_count", &self.inner.node_count())
            .field("link_count", &self.inner.edge_count())
            .finish()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore {
            inner: StableDiGraph::new(),
            by_id: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    /// Insert nodes, replacing any node that already has the same id.
    ///
    /// Fails if a file node would share its path with another file node.
    pub fn put_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> Result<()> {
        for node in nodes {
            self.put_node(node)?;
        }
        Ok(())
    }

    fn put_node(&mut self, node: Node) -> Result<()> {
        if let Some(&owner) = self.by_path.get(&node.path) {
            if owner != node.id && node.kind == NodeKind::File && self.kind_of(owner) == Some(NodeKind::File) {
                return Err(Error::DuplicatePath(node.path));
            }
        }

        let id = node.id;
        let path = node.path.clone();
        let kind = node.kind;

        match self.by_id.get(&id) {
            Some(&idx) => {
                if let Some(slot) = self.inner.node_weight_mut(idx) {
                    if slot.path != path && self.by_path.get(&slot.path) == Some(&id) {
                        self.by_path.remove(&slot.path);
                    }
                    *slot = node;
                }
            }
            None => {
                let idx = self.inner.add_node(node);
                self.by_id.insert(id, idx);
            }
        }

        match self.by_path.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
            // file nodes own their path; other kinds only claim free paths
            Entry::Occupied(mut slot) => {
                if kind == NodeKind::File {
                    slot.insert(id);
                }
            }
        }
        Ok(())
    }

    /// Insert links. Both endpoints must already be present; a link equal to
    /// an existing one (same endpoints and relation) is ignored.
    pub fn put_links(&mut self, links: impl IntoIterator<Item = Link>) -> Result<()> {
        for link in links {
            let (Some(&from), Some(&to)) = (self.by_id.get(&link.from), self.by_id.get(&link.to)) else {
                return Err(Error::DanglingLink { from: link.from, to: link.to });
            };
            let duplicate = self
                .inner
                .edges_directed(from, EdgeDirection::Outgoing)
                .any(|edge| edge.target() == to && edge.weight().relation == link.relation);
            if !duplicate {
                self.inner.add_edge(from, to, link);
            }
        }
        Ok(())
    }

    pub fn get_node(&self, id: NodeId) -> Result<&Node> {
        self.by_id
            .get(&id)
            .and_then(|&idx| self.inner.node_weight(idx))
            .ok_or(Error::NodeNotFound(id))
    }

    pub fn get_node_by_path(&self, path: &str) -> Result<&Node> {
        let path = path.trim_start_matches("./");
        self.by_path
            .get(path)
            .and_then(|&id| self.get_node(id).ok())
            .ok_or_else(|| Error::PathNotFound(path.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }

    fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).ok().map(|node| node.kind)
    }

    /// Ids of nodes one hop away, ascending, optionally restricted to the
    /// given relations.
    pub fn neighbor_ids(
        &self,
        id: NodeId,
        direction: Direction,
        relations: Option<&[Relation]>,
    ) -> Result<Vec<NodeId>> {
        let &idx = self.by_id.get(&id).ok_or(Error::NodeNotFound(id))?;
        let directions: &[EdgeDirection] = match direction {
            Direction::Outgoing => &[EdgeDirection::Outgoing],
            Direction::Incoming => &[EdgeDirection::Incoming],
            Direction::Both => &[EdgeDirection::Outgoing, EdgeDirection::Incoming],
        };

        let mut found = BTreeSet::new();
        for &dir in directions {
            for edge in self.inner.edges_directed(idx, dir) {
                let link = edge.weight();
                if relations.is_some_and(|allowed| !allowed.contains(&link.relation)) {
                    continue;
                }
                found.insert(if dir == EdgeDirection::Outgoing { link.to } else { link.from });
            }
        }
        Ok(found.into_iter().collect())
    }

    /// Nodes one hop away, ordered by id.
    pub fn neighbors(
        &self,
        id: NodeId,
        direction: Direction,
        relations: Option<&[Relation]>,
    ) -> Result<Vec<&Node>> {
        self.neighbor_ids(id, direction, relations)?
            .into_iter()
            .map(|neighbor| self.get_node(neighbor))
            .collect()
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of links.
    pub fn link_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Iterate over all links.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
    }

    /// Freeze the store into an immutable snapshot.
    pub fn snapshot(self, version: u64) -> Snapshot {
        Snapshot::new(version, self, Vec::new(), Vec::new(), BuildStats::default())
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
