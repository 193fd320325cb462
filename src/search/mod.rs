pub mod boolean;
pub mod vector;

use std::{cmp::Ordering, collections::BinaryHeap};

use derivative::Derivative;

use crate::base::DocId;

pub use boolean::{search_boolean, BooleanResults, CnfQuery, QueryError};
pub use vector::{search_vector, RankedResults};

#[derive(Derivative, Clone, Debug)]
#[derivative(Default)]
pub struct SearchOptions {
    /// Size of the first page of ranked results
    #[derivative(Default(value = "10"))]
    pub top_k: usize,

    /// Memory-map the posting file instead of seeking it
    #[derivative(Default(value = "false"))]
    pub in_memory: bool,
}

/// A search result
///
/// Documents are ordered by decreasing score, then by increasing ID: the
/// smallest element is the best one.
#[derive(Clone, Copy, Debug)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(doc_id: DocId, score: f64) -> Self {
        Self { doc_id, score }
    }
}

impl std::fmt::Display for ScoredDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.doc_id, self.score)
    }
}

impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(self.doc_id.cmp(&other.doc_id))
    }
}

/// Keeps the `top_k` best documents; the heap top is the worst of them
pub struct TopScoredDocuments {
    heap: BinaryHeap<ScoredDocument>,
    top_k: usize,
}

impl TopScoredDocuments {
    pub fn new(top_k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(top_k + 1),
            top_k,
        }
    }

    /// Add a new candidate, and returns the new lower bound on scores
    pub fn add(&mut self, candidate: DocId, score: f64) -> f64 {
        let candidate = ScoredDocument::new(candidate, score);
        if self.heap.len() < self.top_k {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }

        // Returns the minimum score
        match self.heap.peek() {
            Some(worst) if self.heap.len() >= self.top_k => worst.score,
            // If the heap is not full, returns -infinity
            _ => f64::NEG_INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Best documents first
    pub fn into_sorted_vec(self) -> Vec<ScoredDocument> {
        self.heap.into_sorted_vec()
    }
}
