//! Ranked (vector space) queries
//!
//! The first page of results is selected with a bounded heap, while a
//! background thread sorts every candidate for the following pages.

use std::collections::{BTreeMap, HashMap};
use std::thread;

use log::{debug, error};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::{ScoredDocument, TopScoredDocuments};
use crate::base::{DocId, Frequency, TermId};
use crate::error::{Error, Result};
use crate::index::Index;

enum FullSort {
    Pending(oneshot::Receiver<Vec<ScoredDocument>>),
    Done(Vec<ScoredDocument>),
    Failed,
}

/// Paginated results of a ranked query
pub struct RankedResults {
    page_size: usize,
    first_page: Vec<ScoredDocument>,
    candidates: usize,
    sorted: FullSort,
}

impl RankedResults {
    fn new(scores: HashMap<DocId, f64>, page_size: usize) -> Self {
        let mut top = TopScoredDocuments::new(page_size);
        for (&doc_id, &score) in scores.iter() {
            top.add(doc_id, score);
        }
        let first_page = top.into_sorted_vec();
        let candidates = scores.len();

        let (sender, receiver) = oneshot::channel();
        let spawned = thread::Builder::new()
            .name("sort-results".to_string())
            .spawn(move || {
                let mut documents: Vec<ScoredDocument> = scores
                    .into_iter()
                    .map(|(doc_id, score)| ScoredDocument::new(doc_id, score))
                    .collect();
                documents.sort_unstable();
                // The receiver may have been dropped already
                let _ = sender.send(documents);
            });

        let sorted = match spawned {
            Ok(_) => FullSort::Pending(receiver),
            Err(e) => {
                error!("Could not start the background sort: {}", e);
                FullSort::Failed
            }
        };

        Self {
            page_size,
            first_page,
            candidates,
            sorted,
        }
    }

    /// Number of matching documents
    pub fn len(&self) -> usize {
        self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            (self.candidates + self.page_size - 1) / self.page_size
        }
    }

    /// The best `page_size` documents, available without waiting
    pub fn first_page(&self) -> &[ScoredDocument] {
        &self.first_page
    }

    /// All the documents if the background sort is over
    pub fn try_sorted(&mut self) -> Option<&[ScoredDocument]> {
        if let FullSort::Pending(receiver) = &mut self.sorted {
            match receiver.try_recv() {
                Ok(documents) => self.sorted = FullSort::Done(documents),
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => self.sorted = FullSort::Failed,
            }
        }

        match &self.sorted {
            FullSort::Done(documents) => Some(documents.as_slice()),
            _ => None,
        }
    }

    /// Waits for the background sort to complete
    ///
    /// Fails when called from within an asynchronous runtime while the sort
    /// is still pending.
    fn wait(&mut self) -> Result<&[ScoredDocument]> {
        if matches!(self.sorted, FullSort::Pending(_)) && Handle::try_current().is_ok() {
            error!("Cannot wait for the background sort within an asynchronous runtime");
            return Err(Error::BackgroundSortFailed);
        }

        let state = std::mem::replace(&mut self.sorted, FullSort::Failed);
        self.sorted = match state {
            FullSort::Pending(receiver) => match receiver.blocking_recv() {
                Ok(documents) => FullSort::Done(documents),
                Err(_) => FullSort::Failed,
            },
            other => other,
        };

        match &self.sorted {
            FullSort::Done(documents) => Ok(documents.as_slice()),
            _ => Err(Error::BackgroundSortFailed),
        }
    }

    /// Returns a page of results (the first page is number 0)
    ///
    /// Pages after the first one wait for the background sort.
    pub fn page(&mut self, number: usize) -> Result<Vec<ScoredDocument>> {
        if number == 0 {
            return Ok(self.first_page.clone());
        }

        let page_size = self.page_size;
        let documents = self.wait()?;
        let start = number.saturating_mul(page_size).min(documents.len());
        let end = start.saturating_add(page_size).min(documents.len());
        Ok(documents[start..end].to_vec())
    }

    /// All the documents, best first
    pub fn into_sorted_vec(mut self) -> Result<Vec<ScoredDocument>> {
        self.wait()?;
        match self.sorted {
            FullSort::Done(documents) => Ok(documents),
            _ => Err(Error::BackgroundSortFailed),
        }
    }
}

/// Query term frequencies, by term ID
fn query_frequencies(index: &Index, query: &str) -> BTreeMap<TermId, Frequency> {
    let mut frequencies = BTreeMap::new();
    for term in index.analyzer().query_terms(query) {
        if let Some(term_id) = index.term_id(&term) {
            *frequencies.entry(term_id).or_insert(0) += 1;
        }
    }
    frequencies
}

/// Scores the documents by summing the weights of the query terms, each
/// multiplied by its frequency in the query
///
/// Every document containing a query term is a candidate, even when its
/// score is zero.
pub fn score_documents(index: &Index, query: &str) -> Result<HashMap<DocId, f64>> {
    let frequencies = query_frequencies(index, query);
    let term_ids: Vec<TermId> = frequencies.keys().copied().collect();
    let lists = index.postings(&term_ids)?;

    let mut scores = HashMap::new();
    for (term_id, query_frequency) in frequencies {
        if let Some(postings) = lists.get(&term_id) {
            for posting in postings {
                *scores.entry(posting.doc_id).or_insert(0.) +=
                    posting.weight as f64 * query_frequency as f64;
            }
        }
    }
    Ok(scores)
}

/// Runs a ranked query, returning results by pages of `top_k` documents
pub fn search_vector(index: &Index, query: &str, top_k: usize) -> Result<RankedResults> {
    let scores = score_documents(index, query)?;
    debug!("Query {:?}: {} candidates", query, scores.len());
    Ok(RankedResults::new(scores, top_k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages() {
        let scores: HashMap<DocId, f64> = (1..=25).map(|doc_id| (doc_id, (doc_id % 7) as f64)).collect();
        let mut expected: Vec<ScoredDocument> = scores
            .iter()
            .map(|(&doc_id, &score)| ScoredDocument::new(doc_id, score))
            .collect();
        expected.sort();

        let mut results = RankedResults::new(scores, 10);
        assert_eq!(results.len(), 25);
        assert_eq!(results.page_count(), 3);
        assert_eq!(results.page(0).unwrap(), expected[..10].to_vec());
        assert_eq!(results.page(1).unwrap(), expected[10..20].to_vec());
        assert_eq!(results.page(2).unwrap(), expected[20..].to_vec());
        assert!(results.page(3).unwrap().is_empty());
        assert_eq!(results.try_sorted().map(|d| d.len()), Some(25));
        assert_eq!(results.into_sorted_vec().unwrap(), expected);
    }

    #[test]
    fn test_no_candidates() {
        let mut results = RankedResults::new(HashMap::new(), 10);
        assert!(results.is_empty());
        assert_eq!(results.page_count(), 0);
        assert!(results.page(0).unwrap().is_empty());
        assert!(results.page(1).unwrap().is_empty());
    }

    #[test]
    fn test_page_out_of_range() {
        let scores: HashMap<DocId, f64> = (1..=5).map(|doc_id| (doc_id, doc_id as f64)).collect();
        let mut results = RankedResults::new(scores, 2);
        assert!(results.page(usize::MAX).unwrap().is_empty());
        assert!(results.page(usize::MAX / 2 + 1).unwrap().is_empty());
        assert_eq!(results.page(2).unwrap(), vec![ScoredDocument::new(1, 1.)]);
    }

    #[test]
    fn test_wait_in_runtime() {
        let scores: HashMap<DocId, f64> = (1..=5).map(|doc_id| (doc_id, doc_id as f64)).collect();
        let mut results = RankedResults::new(scores, 2);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            assert!(results.page(0).is_ok());
            assert!(matches!(results.page(1), Err(Error::BackgroundSortFailed)));
        });

        // The sort can still be waited for outside of the runtime
        let page = results.page(1).unwrap();
        assert_eq!(page.iter().map(|d| d.doc_id).collect::<Vec<_>>(), vec![3, 2]);
    }
}
