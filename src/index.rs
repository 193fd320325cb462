//! On-disk index artifacts and random access to the refined posting lists

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::base::{DocId, RecordSpan, TermId, WeightedPosting};
use crate::codec;
use crate::error::{Error, Result};
use crate::registry::IdMaps;
use crate::stats::CorpusStatistics;
use crate::text::Analyzer;
use crate::utils::buffer::{Buffer, FileBuffer, MemoryBuffer, MmapBuffer};
use crate::utils::channel::SequentialReader;
use crate::weights::WeightFunction;

pub const BLOCKS_FOLDER: &str = "blocks";
pub const MERGED_FILE: &str = "merged.dat";
pub const POSTINGS_FILE: &str = "postings.dat";
pub const POSITIONS_FILE: &str = "positions.cbor";
pub const TERMS_FILE: &str = "terms.cbor";
pub const DOCUMENTS_FILE: &str = "documents.cbor";
pub const STATISTICS_FILE: &str = "statistics.cbor";
pub const MANIFEST_FILE: &str = "index.cbor";

pub const FORMAT_VERSION: u32 = 1;

/// Describes a complete index; only written once every other file is
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexManifest {
    pub version: u32,
    pub weight_function: u8,
    pub analyzer: Analyzer,
    pub documents: usize,
    pub terms: usize,
}

/// Position of each term record in the refined index file
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct PositionMap {
    spans: HashMap<TermId, RecordSpan>,
}

impl PositionMap {
    pub fn from_spans(spans: impl IntoIterator<Item = RecordSpan>) -> Self {
        Self {
            spans: spans.into_iter().map(|span| (span.term_id, span)).collect(),
        }
    }

    pub fn get(&self, term_id: TermId) -> Option<&RecordSpan> {
        self.spans.get(&term_id)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans by increasing file offset
    pub fn sorted_spans(&self) -> Vec<RecordSpan> {
        let mut spans: Vec<RecordSpan> = self.spans.values().copied().collect();
        spans.sort_by_key(|span| span.offset);
        spans
    }

    /// Term IDs by increasing value
    pub fn term_ids(&self) -> Vec<TermId> {
        let mut ids: Vec<TermId> = self.spans.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

pub(crate) fn save_cbor<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    ciborium::ser::into_writer(value, &mut writer)?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn load_cbor<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(ciborium::de::from_reader(reader)?)
}

/// Writes the manifest through a temporary file, so that a reader either sees
/// no manifest or a complete one
pub(crate) fn save_manifest(folder: &Path, manifest: &IndexManifest) -> Result<()> {
    let tmp_path = folder.join(format!("{}.tmp", MANIFEST_FILE));
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(&file);
        ciborium::ser::into_writer(manifest, &mut writer)?;
        writer.flush()?;
        drop(writer);
        file.sync_all()?;
    }
    fs::rename(&tmp_path, folder.join(MANIFEST_FILE))?;
    Ok(())
}

/// How the refined index file is accessed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    /// Seeks a file handle for each record
    File,
    /// Reads the whole file in memory
    Memory,
    /// Memory-maps the file
    Mmap,
}

/// A built index, ready to be searched
///
/// The index is read-only and can be shared between threads.
pub struct Index {
    folder: PathBuf,
    manifest: IndexManifest,
    weight_function: WeightFunction,
    positions: PositionMap,
    maps: IdMaps,
    statistics: CorpusStatistics,
    buffer: Box<dyn Buffer>,
}

impl Index {
    /// Loads an index, either memory-mapped or accessed by seeking the file
    pub fn load(folder: &Path, in_memory: bool) -> Result<Self> {
        let kind = if in_memory {
            BufferKind::Mmap
        } else {
            BufferKind::File
        };
        Self::open(folder, kind)
    }

    pub fn open(folder: &Path, kind: BufferKind) -> Result<Self> {
        let manifest_path = folder.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(Error::IncompleteIndex(folder.to_path_buf()));
        }

        info!("Loading index from {}", folder.display());
        let manifest: IndexManifest = load_cbor(&manifest_path)?;
        let weight_function = WeightFunction::from_id(manifest.weight_function)?;
        let positions: PositionMap = load_cbor(&folder.join(POSITIONS_FILE))?;
        let terms: HashMap<String, TermId> = load_cbor(&folder.join(TERMS_FILE))?;
        let documents: Vec<String> = load_cbor(&folder.join(DOCUMENTS_FILE))?;
        let statistics: CorpusStatistics = load_cbor(&folder.join(STATISTICS_FILE))?;

        let postings_path = folder.join(POSTINGS_FILE);
        let buffer: Box<dyn Buffer> = match kind {
            BufferKind::File => Box::new(FileBuffer::new(&postings_path)?),
            BufferKind::Memory => Box::new(MemoryBuffer::new(&postings_path)?),
            BufferKind::Mmap => Box::new(MmapBuffer::new(&postings_path)?),
        };

        debug!(
            "Index loaded: {} terms, {} documents, weighted with {}",
            positions.len(),
            documents.len(),
            weight_function
        );
        Ok(Self {
            folder: folder.to_path_buf(),
            manifest,
            weight_function,
            positions,
            maps: IdMaps { terms, documents },
            statistics,
            buffer,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn weight_function(&self) -> WeightFunction {
        self.weight_function
    }

    pub fn analyzer(&self) -> Analyzer {
        self.manifest.analyzer
    }

    pub fn statistics(&self) -> &CorpusStatistics {
        &self.statistics
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    /// ID of an (already normalized) term
    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.maps.term_id(term)
    }

    /// Locator of a document
    pub fn document(&self, doc_id: DocId) -> Option<&str> {
        self.maps.document(doc_id)
    }

    pub fn document_count(&self) -> usize {
        self.maps.document_count()
    }

    /// Fetches the posting lists of a batch of terms, reading one record per
    /// known term; unknown terms get an empty list
    pub fn postings(&self, term_ids: &[TermId]) -> Result<HashMap<TermId, Vec<WeightedPosting>>> {
        let mut source = self.buffer.source()?;
        let mut lists = HashMap::with_capacity(term_ids.len());

        for &term_id in term_ids {
            if lists.contains_key(&term_id) {
                continue;
            }

            let postings = match self.positions.get(term_id) {
                Some(span) => {
                    let record = codec::decode::<WeightedPosting>(source.read(span)?)?;
                    if record.term_id != term_id {
                        return Err(Error::decode(format!(
                            "expected term {} at {}, found {}",
                            term_id, span, record.term_id
                        )));
                    }
                    record.postings
                }
                None => Vec::new(),
            };
            lists.insert(term_id, postings);
        }

        Ok(lists)
    }

    /// Reads the whole refined index sequentially, by increasing term ID
    pub fn records(&self, capacity: usize) -> Result<SequentialReader<WeightedPosting>> {
        SequentialReader::open(
            &self.folder.join(POSTINGS_FILE),
            self.positions.sorted_spans(),
            capacity.max(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_map() {
        let positions = PositionMap::from_spans(vec![
            RecordSpan {
                term_id: 2,
                offset: 0,
                length: 16,
            },
            RecordSpan {
                term_id: 1,
                offset: 16,
                length: 28,
            },
        ]);

        assert_eq!(positions.len(), 2);
        assert_eq!(positions.get(1).map(|s| s.offset), Some(16));
        assert!(positions.get(3).is_none());
        assert_eq!(positions.term_ids(), vec![1, 2]);
        assert_eq!(
            positions
                .sorted_spans()
                .iter()
                .map(|s| s.term_id)
                .collect::<Vec<_>>(),
            vec![2, 1]
        );
    }
}
