use rand::{Rng, RngCore};
use rand_distr::{Distribution, Poisson};
use std::cmp::min;
use std::collections::BTreeMap;

/// Name of a vocabulary word (never a stopword, never changed by stemming
/// when stemming is off)
pub fn word(term_ix: usize) -> String {
    format!("w{}", term_ix)
}

pub struct TestDocument {
    pub words: Vec<String>,
}

impl TestDocument {
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Term frequencies in this document
    pub fn frequencies(&self) -> BTreeMap<String, u32> {
        let mut frequencies = BTreeMap::new();
        for word in self.words.iter() {
            *frequencies.entry(word.clone()).or_insert(0) += 1;
        }
        frequencies
    }
}

/// Creates a document whose words are drawn (with repetitions) from the
/// vocabulary, so that term frequencies above one occur
pub fn create_document(
    lambda_words: f32,
    max_words: usize,
    vocabulary_size: usize,
    rng: &mut dyn RngCore,
) -> TestDocument {
    let poi = Poisson::new(lambda_words).unwrap();
    let num_words = 1 + poi.sample(rng) as usize;

    let words = (0..min(num_words, max_words))
        .map(|_| word(rng.gen_range(0..vocabulary_size)))
        .collect();

    TestDocument { words }
}
