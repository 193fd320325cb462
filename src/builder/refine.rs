//! Second pass: weighting the merged posting lists

use std::path::Path;

use log::info;

use super::{progress_bar, MergedIndex, PROGRESS_STEP};
use crate::base::{Posting, RawRecord, RecordSpan, RefinedRecord, TermRecord, WeightedPosting};
use crate::error::Result;
use crate::stats::CorpusStatistics;
use crate::utils::channel::{SequentialReader, SequentialWriter};
use crate::weights::{TermStatistics, WeightFunction};

pub struct Refiner<'a> {
    weight_function: WeightFunction,
    statistics: &'a CorpusStatistics,
}

impl<'a> Refiner<'a> {
    pub fn new(weight_function: WeightFunction, statistics: &'a CorpusStatistics) -> Self {
        Self {
            weight_function,
            statistics,
        }
    }

    /// Weights every posting of a complete posting list
    pub fn refine_record(&self, record: RawRecord) -> RefinedRecord {
        let collection_frequency = record.postings.iter().map(|p| p.frequency as u64).sum();
        let term = TermStatistics::new(record.postings.len(), collection_frequency);

        let postings = record
            .postings
            .iter()
            .map(|posting| {
                let weight = self.weight_function.weight(
                    posting.frequency,
                    &term,
                    posting.doc_id,
                    self.statistics,
                );
                WeightedPosting::new(posting.doc_id, posting.frequency, weight as f32)
            })
            .collect();

        TermRecord::new(record.term_id, postings)
    }

    /// Reads the merged index and writes the weighted one; the memory budget
    /// is split between the reader and the writer
    pub fn refine(
        &self,
        merged: &MergedIndex,
        output: &Path,
        memory: usize,
        progress: bool,
    ) -> Result<Vec<RecordSpan>> {
        info!("Refining index with {}", self.weight_function);
        let capacity = (memory / 2).max(1);

        let mut reader: SequentialReader<Posting> =
            SequentialReader::open(&merged.path, merged.spans.iter().copied(), capacity)?;
        let mut writer: SequentialWriter<WeightedPosting> =
            SequentialWriter::create(output, capacity)?;
        let progress = progress_bar(merged.spans.len(), progress);

        let mut counter = 0;
        while let Some(record) = reader.pop()? {
            writer.append(self.refine_record(record))?;
            progress.inc(1);
            counter += 1;
            if counter % PROGRESS_STEP == 0 {
                info!("{} terms refined", counter);
            }
        }
        progress.finish();

        let spans = writer.close()?;
        info!("Refine ended");
        Ok(spans)
    }
}
