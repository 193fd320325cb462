//! Boolean queries in conjunctive normal form
//!
//! A query is a conjunction (`&&`) of parenthesized disjunctions (`||`) of
//! terms, e.g. `(cat || dog) && !(bird)`. The negation applies to a whole
//! disjunction only, and at least one disjunction must not be negated: the
//! negation filters a query rather than complementing it.

use log::{debug, warn};
use thiserror::Error;

use super::ScoredDocument;
use crate::base::{TermId, WeightedPosting};
use crate::error::Result;
use crate::index::Index;
use crate::sets;
use crate::text::Analyzer;

const AND: &str = "&&";
const OR: &str = "||";

/// Why a boolean query was not evaluated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Empty query")]
    Empty,

    #[error("Queries only containing negative disjunctions won't be processed")]
    NoPositiveDisjunction,

    #[error("The NOT operator only applies to a parenthesized disjunction: {0}")]
    NegatedTerm(String),

    #[error("Disjunctions must be surrounded by parentheses: {0}")]
    MissingParentheses(String),

    #[error("Empty disjunction in the query")]
    EmptyDisjunction,
}

/// A parsed query: normalized terms, grouped by disjunction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CnfQuery {
    pub positive: Vec<Vec<String>>,
    pub negative: Vec<Vec<String>>,
}

fn parse_disjunction(group: &str, analyzer: &Analyzer) -> std::result::Result<Vec<String>, QueryError> {
    let inner = group
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| QueryError::MissingParentheses(group.to_string()))?;

    let terms: Vec<&str> = inner
        .split(OR)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .collect();
    if terms.iter().any(|term| term.starts_with('!')) {
        return Err(QueryError::NegatedTerm(group.to_string()));
    }
    let terms: Vec<String> = terms.into_iter().map(|term| analyzer.normalize(term)).collect();

    if terms.is_empty() {
        return Err(QueryError::EmptyDisjunction);
    }
    Ok(terms)
}

/// Parses a CNF query, normalizing its terms like the indexed documents
pub fn parse_cnf(query: &str, analyzer: &Analyzer) -> std::result::Result<CnfQuery, QueryError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(QueryError::Empty);
    }

    let mut cnf = CnfQuery::default();
    for group in query.split(AND).map(str::trim) {
        if group.is_empty() {
            return Err(QueryError::EmptyDisjunction);
        }

        match group.strip_prefix('!') {
            Some(negated) => {
                let negated = negated.trim_start();
                if !negated.starts_with('(') {
                    return Err(QueryError::NegatedTerm(group.to_string()));
                }
                cnf.negative.push(parse_disjunction(negated, analyzer)?);
            }
            None => cnf.positive.push(parse_disjunction(group, analyzer)?),
        }
    }

    if cnf.positive.is_empty() {
        return Err(QueryError::NoPositiveDisjunction);
    }
    Ok(cnf)
}

/// Union of the posting lists of a disjunction
fn evaluate_disjunction(lists: Vec<Vec<WeightedPosting>>) -> Vec<WeightedPosting> {
    lists
        .into_iter()
        .fold(Vec::new(), |result, list| sets::union(&result, &list))
}

/// Intersects disjunctions, cheapest (fewest postings) first
fn evaluate_conjunction(mut disjunctions: Vec<Vec<Vec<WeightedPosting>>>) -> Vec<WeightedPosting> {
    disjunctions.sort_by_key(|lists| lists.iter().map(Vec::len).sum::<usize>());

    let mut disjunctions = disjunctions.into_iter();
    let mut result = match disjunctions.next() {
        Some(lists) => evaluate_disjunction(lists),
        None => return Vec::new(),
    };

    for lists in disjunctions {
        if result.is_empty() {
            break;
        }
        result = sets::intersection(&result, &evaluate_disjunction(lists));
    }
    result
}

/// Evaluates a CNF whose terms were replaced by their posting lists
pub fn evaluate_cnf(
    positive: Vec<Vec<Vec<WeightedPosting>>>,
    negative: Vec<Vec<Vec<WeightedPosting>>>,
) -> Vec<WeightedPosting> {
    let positive = evaluate_conjunction(positive);
    if positive.is_empty() {
        return positive;
    }
    let negative = evaluate_conjunction(negative);
    sets::difference(&positive, &negative)
}

/// Matching documents, or the reason why the query was rejected
#[derive(Debug, Clone, Default)]
pub struct BooleanResults {
    /// Sorted by decreasing weight (ties in document order)
    pub documents: Vec<ScoredDocument>,
    pub rejection: Option<QueryError>,
}

impl BooleanResults {
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

fn known_terms(index: &Index, cnf: &[Vec<String>]) -> Vec<Vec<TermId>> {
    cnf.iter()
        .map(|terms| terms.iter().filter_map(|term| index.term_id(term)).collect())
        .collect()
}

/// Runs a boolean query; unknown terms are dropped from their disjunction
pub fn search_boolean(index: &Index, query: &str) -> Result<BooleanResults> {
    let cnf = match parse_cnf(query, &index.analyzer()) {
        Ok(cnf) => cnf,
        Err(rejection) => {
            warn!("Query {:?} rejected: {}", query, rejection);
            return Ok(BooleanResults {
                documents: Vec::new(),
                rejection: Some(rejection),
            });
        }
    };

    let positive = known_terms(index, &cnf.positive);
    let negative = known_terms(index, &cnf.negative);

    let all_ids: Vec<TermId> = positive.iter().chain(negative.iter()).flatten().copied().collect();
    let lists = index.postings(&all_ids)?;
    let fetch = |ids: Vec<Vec<TermId>>| -> Vec<Vec<Vec<WeightedPosting>>> {
        ids.into_iter()
            .map(|ids| {
                ids.iter()
                    .map(|id| lists.get(id).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    };
    let positive = fetch(positive);
    let negative = fetch(negative);

    let mut documents: Vec<ScoredDocument> = evaluate_cnf(positive, negative)
        .into_iter()
        .map(|posting| ScoredDocument::new(posting.doc_id, posting.weight as f64))
        .collect();
    // Stable, so that ties keep the document order
    documents.sort_by(|a, b| b.score.total_cmp(&a.score));

    debug!("Query {:?}: {} documents", query, documents.len());
    Ok(BooleanResults {
        documents,
        rejection: None,
    })
}
