//! Inverted index over node tokens

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::model::NodeId;
use crate::tokenize::unique_terms;

/// Largest page a single query may request.
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: NodeId,
    pub score: u32,
}

/// Keyword index built once per snapshot.
#[derive(Debug, Default)]
pub struct SearchIndex {
    postings: HashMap<String, Vec<(NodeId, u32)>>,
    path_len: HashMap<NodeId, usize>,
}

impl SearchIndex {
    pub fn index(store: &GraphStore) -> Self {
        let mut postings: HashMap<String, Vec<(NodeId, u32)>> = HashMap::new();
        let mut path_len = HashMap::with_capacity(store.node_count());

        for node in store.nodes() {
            path_len.insert(node.id, node.path.len());
            for (term, &count) in &node.tokens {
                postings.entry(term.clone()).or_default().push((node.id, count));
            }
        }

        SearchIndex { postings, path_len }
    }

    /// Rank nodes by summed term frequency over the query's terms.
    ///
    /// Ties go to the shorter path, then the smaller id.
    pub fn query(&self, terms: &str, limit: usize, offset: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Err(Error::InvalidArgument("limit must be positive".into()));
        }
        if limit > MAX_LIMIT {
            return Err(Error::InvalidArgument(format!("limit must be at most {MAX_LIMIT}")));
        }

        let mut scores: HashMap<NodeId, u32> = HashMap::new();
        for term in unique_terms(terms) {
            let Some(posting) = self.postings.get(&term) else {
                continue;
            };
            for &(id, count) in posting {
                *scores.entry(id).or_insert(0) += count;
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(id, score)| SearchHit { id, score })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| self.path_len(a.id).cmp(&self.path_len(b.id)))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(hits.into_iter().skip(offset).take(limit).collect())
    }

    fn path_len(&self, id: NodeId) -> usize {
        self.path_len.get(&id).copied().unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeKind};

    fn store_with(paths: &[&str]) -> GraphStore {
        let mut store = GraphStore::new();
        store
            .put_nodes(paths.iter().map(|p| Node::new(NodeKind::File, *p).with_terms(p)))
            .unwrap();
        store
    }

    #[test]
    fn exact_path_ranks_first() {
        let store = store_with(&["A", "B", "C"]);
        let index = SearchIndex::index(&store);
        let hits = index.query("A", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, NodeId::new(NodeKind::File, "A"));
    }

    #[test]
    fn higher_term_frequency_wins() {
        let store = store_with(&["map/map_view.ts", "map.ts", "list.ts"]);
        let index = SearchIndex::index(&store);
        let hits = index.query("map", 10, 0).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, NodeId::new(NodeKind::File, "map/map_view.ts"));
        assert_eq!(hits[0].score, 2);
    }

    #[test]
    fn ties_break_on_shorter_path() {
        let store = store_with(&["src/story/generator.py", "story.py"]);
        let index = SearchIndex::index(&store);
        let hits = index.query("story", 10, 0).unwrap();
        assert_eq!(hits[0].id, NodeId::new(NodeKind::File, "story.py"));
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn scores_sum_across_terms_and_ignore_case() {
        let store = store_with(&["booking/BookingService.ts", "booking/router.ts"]);
        let index = SearchIndex::index(&store);
        let hits = index.query("Booking SERVICE", 10, 0).unwrap();
        assert_eq!(hits[0].id, NodeId::new(NodeKind::File, "booking/BookingService.ts"));
        assert_eq!(hits[0].score, 3);
        assert_eq!(hits[1].score, 1);
    }

    #[test]
    fn repeated_queries_are_stable() {
        let store = store_with(&["a/x.rs", "b/x.rs", "c/x.rs", "x.rs"]);
        let index = SearchIndex::index(&store);
        let first = index.query("x", 10, 0).unwrap();
        for _ in 0..5 {
            assert_eq!(index.query("x", 10, 0).unwrap(), first);
        }
    }

    #[test]
    fn pagination_slices_ranked_results() {
        let store = store_with(&["x1/x.rs", "x2/x.rs", "x3/x.rs"]);
        let index = SearchIndex::index(&store);
        let all = index.query("x", 10, 0).unwrap();
        let page = index.query("x", 1, 1).unwrap();
        assert_eq!(page, vec![all[1]]);
        assert!(index.query("x", 10, 5).unwrap().is_empty());
    }

    #[test]
    fn no_matching_terms_is_empty_not_error() {
        let store = store_with(&["a.rs"]);
        let index = SearchIndex::index(&store);
        assert!(index.query("zebra", 10, 0).unwrap().is_empty());
        assert!(index.query("", 10, 0).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_limits() {
        let index = SearchIndex::index(&store_with(&["a.rs"]));
        let err = index.query("a", 0, 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(index.query("a", MAX_LIMIT + 1, 0).is_err());
    }
}
