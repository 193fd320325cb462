//! Parsing of one block into a sorted block index file

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::base::{DocId, Frequency, Posting, RecordSpan, TermId, TermRecord};
use crate::collection::{read_document, Block, Collection};
use crate::error::Result;
use crate::registry::IdRegistry;
use crate::text::Analyzer;
use crate::utils::channel::SequentialWriter;

/// A block index written to disk
#[derive(Debug)]
pub struct BlockIndex {
    pub name: String,
    pub path: PathBuf,

    /// Position of each term record, by increasing term ID
    pub spans: Vec<RecordSpan>,
    pub documents: usize,

    /// Number of tokens read (stopwords included)
    pub tokens: usize,
}

/// Everything a block worker reads, shared by all workers
pub struct ParseContext<'a> {
    pub collection: &'a dyn Collection,
    pub registry: &'a IdRegistry,
    pub stopwords: &'a HashSet<String>,
    pub analyzer: Analyzer,

    /// Number of records buffered before writing the block file
    pub capacity: usize,
}

pub struct BlockParser<'a> {
    context: &'a ParseContext<'a>,
    block: &'a Block,
    path: PathBuf,
}

impl<'a> BlockParser<'a> {
    pub fn new(context: &'a ParseContext<'a>, block: &'a Block, path: &Path) -> Self {
        Self {
            context,
            block,
            path: path.to_path_buf(),
        }
    }

    /// Term frequencies of a document, stopwords removed
    fn document_frequencies(&self, doc_id: DocId) -> Result<(BTreeMap<String, Frequency>, usize)> {
        let text = read_document(self.context.collection, doc_id)?;
        let mut frequencies = BTreeMap::new();
        let mut tokens = 0;

        for token in self.context.analyzer.tokenize(&text) {
            tokens += 1;
            if let Some(term) = self.context.analyzer.term(token, self.context.stopwords) {
                *frequencies.entry(term).or_insert(0) += 1;
            }
        }
        Ok((frequencies, tokens))
    }

    /// Parses the block and writes its index
    pub fn run(self) -> Result<BlockIndex> {
        info!("Parsing block {}", self.block.name);

        let mut index: BTreeMap<TermId, Vec<Posting>> = BTreeMap::new();
        let mut tokens = 0;

        for &doc_id in self.block.documents.iter() {
            let (frequencies, doc_tokens) = self.document_frequencies(doc_id)?;
            tokens += doc_tokens;

            for (term, frequency) in frequencies {
                let term_id = self.context.registry.term_id(&term);
                let postings = index.entry(term_id).or_default();
                debug_assert!(
                    postings.last().map_or(true, |p| p.doc_id < doc_id),
                    "Documents of a block should have increasing IDs"
                );
                postings.push(Posting::new(doc_id, frequency));
            }
        }

        debug!(
            "Block {}: {} terms, writing {}",
            self.block.name,
            index.len(),
            self.path.display()
        );
        let mut writer = SequentialWriter::create(&self.path, self.context.capacity)?;
        for (term_id, postings) in index {
            writer.append(TermRecord::new(term_id, postings))?;
        }
        let spans = writer.close()?;

        info!("Block {} successfully parsed", self.block.name);
        Ok(BlockIndex {
            name: self.block.name.clone(),
            path: self.path,
            spans,
            documents: self.block.documents.len(),
            tokens,
        })
    }
}
