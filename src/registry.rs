//! Allocation of document and term identifiers
//!
//! Document IDs are given out by the (single) component that enumerates the
//! collection, while term IDs are requested concurrently by every block
//! worker. Both are 1-based and contiguous.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::base::{DocId, TermId};

#[derive(Default)]
struct TermTable {
    ids: HashMap<String, TermId>,
    terms: Vec<String>,
}

#[derive(Default)]
pub struct IdRegistry {
    /// Locators, indexed by `doc_id - 1`
    documents: Vec<String>,
    terms: RwLock<TermTable>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new document and returns its ID
    pub fn add_document(&mut self, locator: impl Into<String>) -> DocId {
        self.documents.push(locator.into());
        self.documents.len() as DocId
    }

    pub fn document(&self, doc_id: DocId) -> Option<&str> {
        doc_locator(&self.documents, doc_id)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Returns the ID of a term, minting one if the term was never seen
    ///
    /// Concurrent callers asking for the same unseen term all observe the
    /// same (single) new ID.
    pub fn term_id(&self, term: &str) -> TermId {
        if let Some(&id) = self.terms.read().ids.get(term) {
            return id;
        }

        let mut table = self.terms.write();
        // Another worker may have inserted it between the two locks
        if let Some(&id) = table.ids.get(term) {
            return id;
        }
        table.terms.push(term.to_string());
        let id = table.terms.len() as TermId;
        table.ids.insert(term.to_string(), id);
        id
    }

    /// Returns the ID of a known term
    pub fn lookup_term(&self, term: &str) -> Option<TermId> {
        self.terms.read().ids.get(term).copied()
    }

    pub fn term(&self, term_id: TermId) -> Option<String> {
        let table = self.terms.read();
        table
            .terms
            .get((term_id as usize).checked_sub(1)?)
            .cloned()
    }

    pub fn term_count(&self) -> usize {
        self.terms.read().terms.len()
    }

    /// Freezes the registry into the maps persisted with the index
    pub fn into_maps(self) -> IdMaps {
        IdMaps {
            terms: self.terms.into_inner().ids,
            documents: self.documents,
        }
    }
}

fn doc_locator(documents: &[String], doc_id: DocId) -> Option<&str> {
    documents
        .get((doc_id as usize).checked_sub(1)?)
        .map(String::as_str)
}

/// Read-only identifier maps, used to translate queries and results
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct IdMaps {
    pub terms: HashMap<String, TermId>,
    pub documents: Vec<String>,
}

impl IdMaps {
    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.terms.get(term).copied()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&str> {
        doc_locator(&self.documents, doc_id)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}
