use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use bsbi_index::{
    base::{DocId, TermId},
    builder::BuilderOptions,
    index::{BufferKind, Index},
    search::{search_boolean, search_vector, ScoredDocument, TopScoredDocuments},
};
use helpers::{documents::word, index::TestIndex};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use rstest::rstest;

/// Initialize the logger
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build(weight_function: u8, seed: u64) -> TestIndex {
    TestIndex::new(
        100,
        4,
        30,
        15.,
        Some(seed),
        BuilderOptions {
            memory: 50,
            weight_function,
            stemming: false,
            ..Default::default()
        },
    )
}

/// Scores every document by looking up each query term separately
fn brute_force(index: &Index, query: &[String]) -> Vec<ScoredDocument> {
    let mut frequencies = BTreeMap::<TermId, u32>::new();
    for term in query {
        if let Some(term_id) = index.term_id(term) {
            *frequencies.entry(term_id).or_insert(0) += 1;
        }
    }

    let mut scores = HashMap::<DocId, f64>::new();
    for (term_id, frequency) in frequencies {
        let lists = index.postings(&[term_id]).unwrap();
        for posting in lists[&term_id].iter() {
            *scores.entry(posting.doc_id).or_insert(0.) += posting.weight as f64 * frequency as f64;
        }
    }

    let mut documents: Vec<ScoredDocument> = scores
        .into_iter()
        .map(|(doc_id, score)| ScoredDocument::new(doc_id, score))
        .collect();
    documents.sort();
    documents
}

#[test]
fn test_heap() {
    let mut top = TopScoredDocuments::new(3);
    assert!(top.add(0, 0.1) == f64::NEG_INFINITY);

    let mut max = top.add(1, 0.2);
    assert!(max == f64::NEG_INFINITY, "Expected -inf got {}", max);

    max = top.add(2, 0.3);
    assert!(max == 0.1, "Expected 0.1 got {}", max);

    max = top.add(4, 0.05);
    assert!(max == 0.1, "Expected 0.1 got {}", max);

    max = top.add(3, 0.5);
    assert!(max == 0.2, "Expected 0.2 got {}", max);

    // Further tests
    let top_k = 10;
    let mut rng = StdRng::seed_from_u64(5);
    let log_normal = LogNormal::new(0., 1.).unwrap();

    let mut scored_documents: Vec<ScoredDocument> = Vec::new();
    top = TopScoredDocuments::new(top_k);
    for doc_id in 0..10000 {
        let score = log_normal.sample(&mut rng);
        top.add(doc_id, score);
        scored_documents.push(ScoredDocument::new(doc_id, score));
    }

    // Compare
    scored_documents.sort();
    let expected = scored_documents[0..top_k].to_vec();
    assert_eq!(top.into_sorted_vec(), expected);
}

#[rstest]
#[case(0, 10, BufferKind::File)]
#[case(4, 7, BufferKind::Mmap)]
#[case(8, 1, BufferKind::Memory)]
#[case(1, 1000, BufferKind::File)]
fn test_vector_pages(#[case] weight_function: u8, #[case] top_k: usize, #[case] kind: BufferKind) {
    init_logger();
    let data = build(weight_function, 11);
    let index = data.load(kind);

    for query_doc in [3, 42, 117] {
        // Repeated words count several times
        let query = &data.documents[query_doc].words;
        let expected = brute_force(&index, query);

        let mut results = search_vector(&index, &query.join(" "), top_k).unwrap();
        debug!("Query {}: {} results", query_doc, results.len());
        assert_eq!(results.len(), expected.len());
        assert!(results.len() > 0, "The document itself matches");

        // The first page does not depend on the full sort
        let first_page = results.first_page().to_vec();
        assert_eq!(first_page, expected[..top_k.min(expected.len())].to_vec());

        for page in 0..results.page_count() {
            let start = page * top_k;
            let end = (start + top_k).min(expected.len());
            assert_eq!(results.page(page).unwrap(), expected[start..end].to_vec());
        }
        assert_eq!(results.into_sorted_vec().unwrap(), expected);
    }
}

/// Draws a random disjunction of vocabulary words
fn random_disjunction(rng: &mut StdRng, vocabulary_size: usize) -> Vec<String> {
    let size = rng.gen_range(1..=3);
    (0..size)
        .map(|_| word(rng.gen_range(0..vocabulary_size)))
        .collect()
}

fn disjunction_documents(data: &TestIndex, words: &[String]) -> BTreeSet<DocId> {
    data.documents
        .iter()
        .enumerate()
        .filter(|(_, document)| document.words.iter().any(|w| words.contains(w)))
        .map(|(ix, _)| (ix + 1) as DocId)
        .collect()
}

#[test]
fn test_boolean_random() {
    init_logger();
    let data = build(0, 13);
    let index = data.load(BufferKind::File);
    let mut rng = StdRng::seed_from_u64(13);
    let all_documents: BTreeSet<DocId> = (1..=data.documents.len() as DocId).collect();

    for _ in 0..100 {
        let positive: Vec<Vec<String>> = (0..rng.gen_range(1..=3))
            .map(|_| random_disjunction(&mut rng, data.vocabulary_size))
            .collect();
        let negative: Vec<Vec<String>> = (0..rng.gen_range(0..=2))
            .map(|_| random_disjunction(&mut rng, data.vocabulary_size))
            .collect();

        // Negated disjunctions form their own conjunction, whose documents
        // are removed from those of the positive one
        let conjunction = |disjunctions: &[Vec<String>]| {
            disjunctions.iter().fold(all_documents.clone(), |documents, disjunction| {
                &documents & &disjunction_documents(&data, disjunction)
            })
        };
        let mut expected = conjunction(&positive);
        if !negative.is_empty() {
            expected = &expected - &conjunction(&negative);
        }

        let query = positive
            .iter()
            .map(|d| format!("({})", d.join(" || ")))
            .chain(negative.iter().map(|d| format!("!({})", d.join(" || "))))
            .collect::<Vec<_>>()
            .join(" && ");

        let results = search_boolean(&index, &query).unwrap();
        assert!(!results.is_rejected(), "Query {} was rejected", query);

        let observed: BTreeSet<DocId> = results.documents.iter().map(|d| d.doc_id).collect();
        assert_eq!(observed.len(), results.documents.len());
        assert_eq!(observed, expected, "Query {}", query);

        // Sorted by decreasing weight, then by document
        for pair in results.documents.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].doc_id < pair[1].doc_id)
            );
        }
    }
}

#[test]
fn test_boolean_unknown_terms() {
    let data = build(0, 17);
    let index = data.load(BufferKind::Memory);
    let known = word(1);
    let expected: HashSet<DocId> = disjunction_documents(&data, &[known.clone()])
        .into_iter()
        .collect();

    let results = search_boolean(&index, &format!("(unicorn || {})", known)).unwrap();
    let observed: HashSet<DocId> = results.documents.iter().map(|d| d.doc_id).collect();
    assert_eq!(observed, expected);

    // A disjunction of unknown terms matches nothing
    let results = search_boolean(&index, &format!("({}) && (unicorn)", known)).unwrap();
    assert!(!results.is_rejected());
    assert!(results.documents.is_empty());
}
