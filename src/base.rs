use std::fmt;

use serde::{Deserialize, Serialize};

pub type TermId = u32;
pub type DocId = u32;
pub type Frequency = u32;
pub type Weight = f32;

/// Marks object that have a length
pub trait Len {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Anything that lives in a posting list sorted by document
pub trait DocPosting: Clone {
    fn doc_id(&self) -> DocId;
}

/// Raw posting = document ID + term frequency
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: Frequency,
}

impl Posting {
    pub fn new(doc_id: DocId, frequency: Frequency) -> Self {
        Self { doc_id, frequency }
    }
}

/// Refined posting: the raw posting together with its weight
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct WeightedPosting {
    pub doc_id: DocId,
    pub frequency: Frequency,
    pub weight: Weight,
}

impl WeightedPosting {
    pub fn new(doc_id: DocId, frequency: Frequency, weight: Weight) -> Self {
        Self {
            doc_id,
            frequency,
            weight,
        }
    }
}

impl DocPosting for Posting {
    #[inline]
    fn doc_id(&self) -> DocId {
        self.doc_id
    }
}

impl DocPosting for WeightedPosting {
    #[inline]
    fn doc_id(&self) -> DocId {
        self.doc_id
    }
}

impl DocPosting for DocId {
    #[inline]
    fn doc_id(&self) -> DocId {
        *self
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.doc_id, self.frequency)
    }
}

impl fmt::Display for WeightedPosting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{},{})", self.doc_id, self.frequency, self.weight)
    }
}

/// The unit written to and read from index files: a term and its postings
#[derive(Clone, Debug, PartialEq)]
pub struct TermRecord<P> {
    pub term_id: TermId,
    pub postings: Vec<P>,
}

impl<P> TermRecord<P> {
    pub fn new(term_id: TermId, postings: Vec<P>) -> Self {
        Self { term_id, postings }
    }
}

impl<P> Len for TermRecord<P> {
    fn len(&self) -> usize {
        self.postings.len()
    }
}

/// A raw (frequency only) term record
pub type RawRecord = TermRecord<Posting>;

/// A refined (weighted) term record
pub type RefinedRecord = TermRecord<WeightedPosting>;

/// Location of one encoded record within an index file
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordSpan {
    pub term_id: TermId,
    pub offset: u64,
    pub length: u64,
}

impl RecordSpan {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

impl fmt::Display for RecordSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(term: {}, pos: {}, len: {})",
            self.term_id, self.offset, self.length
        )
    }
}
