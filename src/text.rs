//! Tokenization and normalization of documents and queries

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

use crate::error::Result;

lazy_static! {
    static ref QUERY_SEPARATOR: Regex = Regex::new(r"[^a-zA-Z\d:]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Turns raw tokens into index terms
///
/// The same analyzer must be used to build and to query an index, which is
/// why it is stored in the index manifest.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Analyzer {
    pub stemming: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self { stemming: true }
    }
}

impl Analyzer {
    pub fn new(stemming: bool) -> Self {
        Self { stemming }
    }

    /// Document tokens are separated by whitespace
    pub fn tokenize<'a>(&self, text: &'a str) -> impl Iterator<Item = &'a str> {
        text.split_whitespace()
    }

    /// Lower-cases (and stems) a token
    pub fn normalize(&self, token: &str) -> String {
        let lower = token.to_lowercase();
        self.stem(lower)
    }

    fn stem(&self, lower: String) -> String {
        if self.stemming {
            STEMMER.stem(&lower).into_owned()
        } else {
            lower
        }
    }

    /// Normalizes a document token, or returns `None` for a stopword
    ///
    /// Stopwords are matched before stemming.
    pub fn term(&self, token: &str, stopwords: &HashSet<String>) -> Option<String> {
        let lower = token.to_lowercase();
        if stopwords.contains(&lower) {
            None
        } else {
            Some(self.stem(lower))
        }
    }

    /// Splits a free-text query on anything that is not alphanumeric
    pub fn query_terms(&self, query: &str) -> Vec<String> {
        QUERY_SEPARATOR
            .split(query)
            .filter(|word| !word.is_empty())
            .map(|word| self.normalize(word))
            .collect()
    }
}

/// Loads a stopword list (one word per line)
pub fn load_stopwords(path: &Path) -> Result<HashSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_stopwords(&content))
}

pub fn parse_stopwords(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_lowercase)
        .collect()
}
