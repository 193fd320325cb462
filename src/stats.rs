//! Corpus statistics gathered while merging
//!
//! Weights can only be computed from [CorpusStatistics], which is produced by
//! [StatisticsAccumulator::finish] once every posting list went through the
//! accumulator: the average document length is final at that point.

use serde::{Deserialize, Serialize};

use crate::base::{DocId, Frequency, Posting};

#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct DocumentStatistics {
    /// Number of (non stopword) tokens
    pub length: u64,

    /// Largest term frequency
    pub max_frequency: Frequency,
}

/// Streams over the merged posting lists
pub struct StatisticsAccumulator {
    collection_size: usize,

    /// Indexed by `doc_id - 1`
    documents: Vec<DocumentStatistics>,
    total_length: u64,
    posting_lists: usize,
}

impl StatisticsAccumulator {
    pub fn new(collection_size: usize) -> Self {
        Self {
            collection_size,
            documents: vec![DocumentStatistics::default(); collection_size],
            total_length: 0,
            posting_lists: 0,
        }
    }

    /// Updates the statistics with a complete posting list
    pub fn process_posting_list(&mut self, postings: &[Posting]) {
        for posting in postings {
            let ix = (posting.doc_id as usize)
                .checked_sub(1)
                .expect("Document IDs start at 1");
            if ix >= self.documents.len() {
                self.documents.resize(ix + 1, DocumentStatistics::default());
            }

            let stats = &mut self.documents[ix];
            stats.length += posting.frequency as u64;
            stats.max_frequency = stats.max_frequency.max(posting.frequency);
            self.total_length += posting.frequency as u64;
        }
        self.posting_lists += 1;
    }

    /// Number of posting lists processed so far
    pub fn posting_lists(&self) -> usize {
        self.posting_lists
    }

    /// Signals the end of the merge and computes the average length
    pub fn finish(self) -> CorpusStatistics {
        let average_length = if self.collection_size == 0 {
            0.
        } else {
            self.total_length as f64 / self.collection_size as f64
        };

        CorpusStatistics {
            collection_size: self.collection_size,
            average_length,
            documents: self.documents,
        }
    }
}

/// Final statistics over the whole collection
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CorpusStatistics {
    collection_size: usize,
    average_length: f64,
    documents: Vec<DocumentStatistics>,
}

impl CorpusStatistics {
    pub fn collection_size(&self) -> usize {
        self.collection_size
    }

    pub fn average_length(&self) -> f64 {
        self.average_length
    }

    /// Statistics of a document (zero for documents without any term)
    pub fn document(&self, doc_id: DocId) -> DocumentStatistics {
        (doc_id as usize)
            .checked_sub(1)
            .and_then(|ix| self.documents.get(ix))
            .copied()
            .unwrap_or_default()
    }

    pub fn document_length(&self, doc_id: DocId) -> u64 {
        self.document(doc_id).length
    }

    pub fn max_frequency(&self, doc_id: DocId) -> Frequency {
        self.document(doc_id).max_frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let mut accumulator = StatisticsAccumulator::new(3);
        accumulator.process_posting_list(&[Posting::new(1, 2), Posting::new(3, 1)]);
        accumulator.process_posting_list(&[Posting::new(1, 5)]);
        accumulator.process_posting_list(&[Posting::new(2, 1), Posting::new(3, 4)]);
        assert_eq!(accumulator.posting_lists(), 3);

        let stats = accumulator.finish();
        assert_eq!(stats.collection_size(), 3);
        assert_eq!(stats.document_length(1), 7);
        assert_eq!(stats.max_frequency(1), 5);
        assert_eq!(stats.document_length(2), 1);
        assert_eq!(stats.document(3).max_frequency, 4);
        assert_eq!(stats.average_length(), 13. / 3.);

        // Unknown documents have empty statistics
        assert_eq!(stats.document(42), DocumentStatistics::default());
    }

    #[test]
    fn test_empty_collection() {
        let stats = StatisticsAccumulator::new(0).finish();
        assert_eq!(stats.average_length(), 0.);
    }
}
