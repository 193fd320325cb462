//! Set operations over posting lists sorted by document ID
//!
//! All operations run in one linear pass over both inputs, and assume that
//! each input is strictly increasing in document ID.

use crate::base::DocPosting;

/// Union of two lists; a document present in both keeps the left posting
pub fn union<P: DocPosting>(left: &[P], right: &[P]) -> Vec<P> {
    let mut result = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        let (a, b) = (left[i].doc_id(), right[j].doc_id());
        if a < b {
            result.push(left[i].clone());
            i += 1;
        } else if a > b {
            result.push(right[j].clone());
            j += 1;
        } else {
            result.push(left[i].clone());
            i += 1;
            j += 1;
        }
    }
    result.extend_from_slice(&left[i..]);
    result.extend_from_slice(&right[j..]);
    result
}

/// Intersection of two lists, keeping the left postings
pub fn intersection<P: DocPosting>(left: &[P], right: &[P]) -> Vec<P> {
    let mut result = Vec::new();
    if left.is_empty() || right.is_empty() {
        return result;
    }

    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        let (a, b) = (left[i].doc_id(), right[j].doc_id());
        if a < b {
            i += 1;
        } else if a > b {
            j += 1;
        } else {
            result.push(left[i].clone());
            i += 1;
            j += 1;
        }
    }
    result
}

/// Postings of `left` whose document does not appear in `right`
pub fn difference<P: DocPosting, Q: DocPosting>(left: &[P], right: &[Q]) -> Vec<P> {
    if right.is_empty() {
        return left.to_vec();
    }

    let mut result = Vec::with_capacity(left.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() {
        if j >= right.len() {
            result.extend_from_slice(&left[i..]);
            break;
        }

        let (a, b) = (left[i].doc_id(), right[j].doc_id());
        if a < b {
            result.push(left[i].clone());
            i += 1;
        } else if a > b {
            j += 1;
        } else {
            i += 1;
            j += 1;
        }
    }
    result
}
