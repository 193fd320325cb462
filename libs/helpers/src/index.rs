use std::collections::{BTreeMap, HashSet};

use ntest::assert_about_eq;
use rand::{rngs::StdRng, SeedableRng};
use temp_dir::TempDir;

use crate::documents::{create_document, TestDocument};
use bsbi_index::{
    base::{DocId, Posting, WeightedPosting},
    builder::{build_index, BuilderOptions, IndexSummary},
    collection::MemoryCollection,
    index::{BufferKind, Index},
    registry::IdRegistry,
};

pub struct TestIndex {
    pub dir: TempDir,
    pub vocabulary_size: usize,

    /// Expected posting lists (by term)
    pub all_terms: BTreeMap<String, Vec<Posting>>,
    pub documents: Vec<TestDocument>,
    pub summary: IndexSummary,
}

impl TestIndex {
    /// Builds the index of random documents, split into `block_count` blocks
    pub fn new(
        vocabulary_size: usize,
        block_count: usize,
        documents_per_block: usize,
        lambda_words: f32,
        seed: Option<u64>,
        options: BuilderOptions,
    ) -> Self {
        let dir = TempDir::new().expect("Could not create temporary directory");
        let mut rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        // Creates documents
        let mut blocks = Vec::new();
        let mut documents = Vec::new();
        for _ in 0..block_count {
            let mut texts = Vec::new();
            for _ in 0..documents_per_block {
                let document = create_document(lambda_words, 50, vocabulary_size, &mut rng);
                texts.push(document.text());
                documents.push(document);
            }
            blocks.push(texts);
        }

        // Documents are numbered from 1, block after block
        let mut all_terms = BTreeMap::<String, Vec<Posting>>::new();
        for (ix, document) in documents.iter().enumerate() {
            let doc_id = (ix + 1) as DocId;
            for (term, frequency) in document.frequencies() {
                all_terms
                    .entry(term)
                    .or_default()
                    .push(Posting::new(doc_id, frequency));
            }
        }

        let mut registry = IdRegistry::new();
        let collection = MemoryCollection::new(blocks, &mut registry);
        let summary = build_index(
            &collection,
            registry,
            &HashSet::new(),
            &dir.path().join("index"),
            &options,
        )
        .expect("Error while building the index");

        Self {
            dir,
            vocabulary_size,
            all_terms,
            documents,
            summary,
        }
    }

    pub fn load(&self, kind: BufferKind) -> Index {
        Index::open(&self.dir.path().join("index"), kind).expect("Error while loading the index")
    }

    /// Number of (non stopword) tokens of a document
    pub fn document_length(&self, doc_id: DocId) -> u64 {
        self.documents[(doc_id - 1) as usize].words.len() as u64
    }
}

/// Checks that posting lists are the same
pub fn check_same_postings(expected: &[WeightedPosting], observed: &[WeightedPosting], weight_eps: f64) {
    assert_eq!(
        expected.len(),
        observed.len(),
        "Expected {} postings, got {}",
        expected.len(),
        observed.len()
    );
    for (a, b) in expected.iter().zip(observed.iter()) {
        assert!(
            a.doc_id == b.doc_id,
            "Expected doc ID {}, got {}",
            a.doc_id,
            b.doc_id
        );
        assert_eq!(a.frequency, b.frequency);
        if weight_eps > 0. {
            assert_about_eq!(a.weight, b.weight, weight_eps);
        } else {
            assert_eq!(a.weight, b.weight);
        }
    }
}
