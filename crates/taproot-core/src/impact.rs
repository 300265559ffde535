//! Blast-radius computation by breadth-first traversal

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::model::{Direction, NodeId, Relation};

/// Depth used when a caller does not bound the traversal.
pub const DEFAULT_DEPTH_CAP: u32 = 512;

/// Parameters of an impact query.
#[derive(Debug, Clone, Default)]
pub struct ImpactQuery {
    pub direction: Direction,
    /// `None` walks to the depth cap.
    pub max_depth: Option<u32>,
    /// `None` follows every relation.
    pub relations: Option<Vec<Relation>>,
}

impl ImpactQuery {
    pub fn incoming() -> Self {
        ImpactQuery::default()
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn relations(mut self, relations: Vec<Relation>) -> Self {
        self.relations = Some(relations);
        self
    }
}

/// A reached node and the length of the shortest path to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Impacted {
    pub id: NodeId,
    pub distance: u32,
}

pub struct ImpactAnalyzer<'a> {
    store: &'a GraphStore,
    depth_cap: u32,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        ImpactAnalyzer { store, depth_cap: DEFAULT_DEPTH_CAP }
    }

    pub fn with_depth_cap(mut self, cap: u32) -> Self {
        self.depth_cap = cap.max(1);
        self
    }

    /// Every node reachable from `origin`, each once at its minimal distance,
    /// ordered by distance then id. The origin itself is never included.
    pub fn impact(&self, origin: NodeId, query: &ImpactQuery) -> Result<Vec<Impacted>> {
        if !self.store.contains(origin) {
            return Err(Error::NodeNotFound(origin));
        }
        let max_depth = match query.max_depth {
            Some(0) => return Err(Error::InvalidArgument("max_depth must be at least 1".into())),
            Some(depth) => depth.min(self.depth_cap),
            None => self.depth_cap,
        };
        let relations = query.relations.as_deref();

        let mut distance: HashMap<NodeId, u32> = HashMap::new();
        let mut queue = VecDeque::new();
        distance.insert(origin, 0);
        queue.push_back((origin, 0u32));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.store.neighbor_ids(current, query.direction, relations)? {
                if distance.contains_key(&next) {
                    continue;
                }
                distance.insert(next, depth + 1);
                queue.push_back((next, depth + 1));
            }
        }

        let mut reached: Vec<Impacted> = distance
            .into_iter()
            .filter(|&(id, _)| id != origin)
            .map(|(id, distance)| Impacted { id, distance })
            .collect();
        reached.sort_by_key(|hit| (hit.distance, hit.id));
        Ok(reached)
    }

    /// Resolve `path` through the store, then run [`Self::impact`].
    pub fn impact_path(&self, path: &str, query: &ImpactQuery) -> Result<Vec<Impacted>> {
        let origin = self.store.get_node_by_path(path)?.id;
        self.impact(origin, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{Link, Node, NodeKind};

    fn id(path: &str) -> NodeId {
        NodeId::new(NodeKind::File, path)
    }

    fn graph(paths: &[&str], links: &[(&str, &str, Relation)]) -> GraphStore {
        let mut store = GraphStore::new();
        store
            .put_nodes(paths.iter().map(|p| Node::new(NodeKind::File, *p)))
            .unwrap();
        store
            .put_links(links.iter().map(|(from, to, rel)| Link::new(id(from), id(to), *rel)))
            .unwrap();
        store
    }

    #[test]
    fn blast_radius_of_a_chain() {
        // C depends on B depends on A
        let store = graph(
            &["A", "B", "C"],
            &[("B", "A", Relation::Imports), ("C", "B", Relation::Imports)],
        );
        let hits = ImpactAnalyzer::new(&store).impact(id("A"), &ImpactQuery::incoming()).unwrap();
        assert_eq!(
            hits,
            vec![
                Impacted { id: id("B"), distance: 1 },
                Impacted { id: id("C"), distance: 2 },
            ]
        );
    }

    #[test]
    fn cycles_terminate_with_minimal_distances() {
        let store = graph(
            &["A", "B", "C"],
            &[
                ("A", "B", Relation::Imports),
                ("B", "C", Relation::Imports),
                ("C", "A", Relation::Imports),
            ],
        );
        let hits = ImpactAnalyzer::new(&store).impact(id("A"), &ImpactQuery::incoming()).unwrap();
        assert_eq!(
            hits,
            vec![
                Impacted { id: id("C"), distance: 1 },
                Impacted { id: id("B"), distance: 2 },
            ]
        );
    }

    #[test]
    fn self_loops_do_not_report_the_origin() {
        let store = graph(&["A", "B"], &[("A", "A", Relation::Includes), ("B", "A", Relation::Includes)]);
        let hits = ImpactAnalyzer::new(&store).impact(id("A"), &ImpactQuery::incoming()).unwrap();
        assert_eq!(hits, vec![Impacted { id: id("B"), distance: 1 }]);
    }

    #[test]
    fn diamond_reports_each_node_once() {
        let store = graph(
            &["base", "left", "right", "top"],
            &[
                ("left", "base", Relation::Imports),
                ("right", "base", Relation::Imports),
                ("top", "left", Relation::Imports),
                ("top", "right", Relation::Imports),
            ],
        );
        let hits = ImpactAnalyzer::new(&store).impact(id("base"), &ImpactQuery::incoming()).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits.iter().filter(|h| h.id == id("top")).count(), 1);
        assert_eq!(hits.last().unwrap(), &Impacted { id: id("top"), distance: 2 });
    }

    #[test]
    fn max_depth_bounds_traversal() {
        let store = graph(
            &["A", "B", "C"],
            &[("B", "A", Relation::Imports), ("C", "B", Relation::Imports)],
        );
        let analyzer = ImpactAnalyzer::new(&store);
        let hits = analyzer.impact(id("A"), &ImpactQuery::incoming().max_depth(1)).unwrap();
        assert_eq!(hits, vec![Impacted { id: id("B"), distance: 1 }]);

        let err = analyzer.impact(id("A"), &ImpactQuery::incoming().max_depth(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn depth_cap_applies_when_unbounded() {
        let store = graph(
            &["A", "B", "C"],
            &[("B", "A", Relation::Imports), ("C", "B", Relation::Imports)],
        );
        let hits = ImpactAnalyzer::new(&store)
            .with_depth_cap(1)
            .impact(id("A"), &ImpactQuery::incoming())
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn relation_filter_skips_other_links() {
        let store = graph(
            &["lib.rs", "main.rs", "README.md"],
            &[("main.rs", "lib.rs", Relation::Imports), ("README.md", "lib.rs", Relation::References)],
        );
        let hits = ImpactAnalyzer::new(&store)
            .impact(id("lib.rs"), &ImpactQuery::incoming().relations(vec![Relation::Imports]))
            .unwrap();
        assert_eq!(hits, vec![Impacted { id: id("main.rs"), distance: 1 }]);
    }

    #[test]
    fn outgoing_follows_dependencies() {
        let store = graph(
            &["A", "B", "C"],
            &[("B", "A", Relation::Imports), ("C", "B", Relation::Imports)],
        );
        let hits = ImpactAnalyzer::new(&store)
            .impact(id("C"), &ImpactQuery::incoming().direction(Direction::Outgoing))
            .unwrap();
        assert_eq!(
            hits,
            vec![
                Impacted { id: id("B"), distance: 1 },
                Impacted { id: id("A"), distance: 2 },
            ]
        );
    }

    #[test]
    fn unknown_origin_is_not_found() {
        let store = graph(&["A"], &[]);
        let analyzer = ImpactAnalyzer::new(&store);
        let err = analyzer.impact(id("nope"), &ImpactQuery::incoming()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = analyzer.impact_path("nope", &ImpactQuery::incoming()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn path_lookup_resolves_origin() {
        let store = graph(&["A", "B"], &[("B", "A", Relation::Imports)]);
        let hits = ImpactAnalyzer::new(&store)
            .impact_path("A", &ImpactQuery::incoming())
            .unwrap();
        assert_eq!(hits, vec![Impacted { id: id("B"), distance: 1 }]);
    }
}
