//! Query operations over the published snapshot
//!
//! Every operation takes the snapshot once at entry and answers entirely from
//! it, so a publish in the middle of a query is never observed.

use std::sync::Arc;

use serde::Serialize;
use taproot_core::{
    DEFAULT_DEPTH_CAP, Direction, Error, ImpactAnalyzer, ImpactQuery, Node, NodeId, NodeKind, Result, Snapshot,
    SnapshotCell,
};

/// How a caller names a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Path(String),
    Id(NodeId),
}

impl NodeRef {
    /// Exactly one of `path` and `id` must be given.
    pub fn from_params(path: Option<String>, id: Option<String>) -> Result<Self> {
        match (path, id) {
            (Some(path), None) => Ok(NodeRef::Path(path)),
            (None, Some(id)) => Ok(NodeRef::Id(id.parse()?)),
            (Some(_), Some(_)) => Err(Error::InvalidArgument("pass either `path` or `id`, not both".into())),
            (None, None) => Err(Error::InvalidArgument("missing `path` or `id`".into())),
        }
    }

    fn resolve<'s>(&self, snapshot: &'s Snapshot) -> Result<&'s Node> {
        match self {
            NodeRef::Path(path) => snapshot.store().get_node_by_path(path),
            NodeRef::Id(id) => snapshot.store().get_node(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub node_id: NodeId,
    pub path: String,
    pub kind: NodeKind,
}

impl From<&Node> for NodeSummary {
    fn from(node: &Node) -> Self {
        NodeSummary { node_id: node.id, path: node.path.clone(), kind: node.kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub node: NodeSummary,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactResult {
    #[serde(flatten)]
    pub node: NodeSummary,
    pub distance: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDetail {
    pub node: Node,
    pub outgoing: Vec<NodeSummary>,
    pub incoming: Vec<NodeSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub node_count: usize,
    pub link_count: usize,
    pub snapshot_version: u64,
    pub warning_count: usize,
}

#[derive(Clone)]
pub struct QueryService {
    cell: Arc<SnapshotCell>,
    depth_cap: u32,
}

impl QueryService {
    pub fn new(cell: Arc<SnapshotCell>) -> Self {
        Self { cell, depth_cap: DEFAULT_DEPTH_CAP }
    }

    pub fn with_depth_cap(mut self, depth_cap: u32) -> Self {
        self.depth_cap = depth_cap.max(1);
        self
    }

    pub fn summary(&self) -> SnapshotSummary {
        let snapshot = self.cell.current();
        SnapshotSummary {
            node_count: snapshot.store().node_count(),
            link_count: snapshot.store().link_count(),
            snapshot_version: snapshot.version(),
            warning_count: snapshot.warnings().len(),
        }
    }

    pub fn search(&self, terms: &str, limit: usize, offset: usize) -> Result<Vec<SearchResult>> {
        let snapshot = self.cell.current();
        let hits = snapshot.search().query(terms, limit, offset)?;
        hits.into_iter()
            .map(|hit| {
                let node = snapshot.store().get_node(hit.id)?;
                Ok(SearchResult { node: node.into(), score: hit.score })
            })
            .collect()
    }

    pub fn impact(&self, target: &NodeRef, query: &ImpactQuery) -> Result<Vec<ImpactResult>> {
        let snapshot = self.cell.current();
        let origin = target.resolve(&snapshot)?.id;
        let analyzer = ImpactAnalyzer::new(snapshot.store()).with_depth_cap(self.depth_cap);
        analyzer
            .impact(origin, query)?
            .into_iter()
            .map(|hit| {
                let node = snapshot.store().get_node(hit.id)?;
                Ok(ImpactResult { node: node.into(), distance: hit.distance })
            })
            .collect()
    }

    pub fn node(&self, target: &NodeRef) -> Result<NodeDetail> {
        let snapshot = self.cell.current();
        let store = snapshot.store();
        let node = target.resolve(&snapshot)?;
        let summaries = |direction| -> Result<Vec<NodeSummary>> {
            Ok(store
                .neighbors(node.id, direction, None)?
                .into_iter()
                .map(NodeSummary::from)
                .collect())
        };
        Ok(NodeDetail {
            node: node.clone(),
            outgoing: summaries(Direction::Outgoing)?,
            incoming: summaries(Direction::Incoming)?,
        })
    }
}
