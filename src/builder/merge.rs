//! Streaming k-way merge of the block indexes

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{debug, info};

use super::{progress_bar, BlockIndex, PROGRESS_STEP};
use crate::base::{Posting, RawRecord, RecordSpan};
use crate::error::Result;
use crate::sets;
use crate::stats::{CorpusStatistics, StatisticsAccumulator};
use crate::utils::channel::{SequentialReader, SequentialWriter};

/// The merged (not yet weighted) index
#[derive(Debug)]
pub struct MergedIndex {
    pub path: PathBuf,
    pub spans: Vec<RecordSpan>,
    pub statistics: CorpusStatistics,
}

pub struct BlockMerger {
    readers: Vec<SequentialReader<Posting>>,
    writer: SequentialWriter<Posting>,
    statistics: StatisticsAccumulator,
    progress: ProgressBar,
    terms: usize,
}

/// Appends the postings of the same term coming from another block
fn join_postings(current: &mut Vec<Posting>, next: Vec<Posting>) {
    let interleaved = match (current.last(), next.first()) {
        (Some(last), Some(first)) => last.doc_id >= first.doc_id,
        _ => false,
    };

    if interleaved {
        *current = sets::union(&current[..], &next[..]);
    } else {
        current.extend(next);
    }
}

impl BlockMerger {
    /// Opens one reader per block and the output writer; the `memory` budget
    /// (in records) is shared evenly between all of them
    pub fn new(
        blocks: Vec<BlockIndex>,
        output: &Path,
        memory: usize,
        collection_size: usize,
        progress: bool,
    ) -> Result<Self> {
        let capacity = (memory / (blocks.len() + 1)).max(1);
        debug!(
            "Merging {} blocks with {} records per channel",
            blocks.len(),
            capacity
        );

        let total: usize = blocks.iter().map(|b| b.spans.len()).sum();
        let readers = blocks
            .into_iter()
            .map(|block| SequentialReader::open(&block.path, block.spans, capacity))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            readers,
            writer: SequentialWriter::create(output, capacity)?,
            statistics: StatisticsAccumulator::new(collection_size),
            progress: progress_bar(total, progress),
            terms: 0,
        })
    }

    /// Pops the record with the smallest term ID among the readers' heads
    /// (the first reader wins ties)
    fn pop_smallest(&mut self) -> Result<Option<RawRecord>> {
        let mut best = None;
        for (ix, reader) in self.readers.iter().enumerate() {
            if let Some(head) = reader.peek() {
                if best.map_or(true, |(_, term_id)| head.term_id < term_id) {
                    best = Some((ix, head.term_id));
                }
            }
        }

        match best {
            Some((ix, _)) => {
                self.progress.inc(1);
                self.readers[ix].pop()
            }
            None => Ok(None),
        }
    }

    fn finalize(&mut self, record: RawRecord) -> Result<()> {
        self.statistics.process_posting_list(&record.postings);
        self.writer.append(record)?;

        self.terms += 1;
        if self.terms % PROGRESS_STEP == 0 {
            info!("{} terms processed", self.terms);
        }
        Ok(())
    }

    /// Merges all the blocks, deleting the block files once consumed
    pub fn merge(mut self) -> Result<MergedIndex> {
        info!("Merging {} block indexes", self.readers.len());

        let mut pending = self.pop_smallest()?;
        while let Some(mut current) = pending {
            match self.pop_smallest()? {
                Some(next) if next.term_id == current.term_id => {
                    join_postings(&mut current.postings, next.postings);
                    pending = Some(current);
                }
                next => {
                    self.finalize(current)?;
                    pending = next;
                }
            }
        }
        self.progress.finish();
        info!("Merging ended: {} unique terms found", self.terms);

        for reader in self.readers.drain(..) {
            let path = reader.path().to_path_buf();
            drop(reader);
            fs::remove_file(&path)?;
        }

        let path = self.writer.path().to_path_buf();
        let spans = self.writer.close()?;
        Ok(MergedIndex {
            path,
            spans,
            statistics: self.statistics.finish(),
        })
    }
}
