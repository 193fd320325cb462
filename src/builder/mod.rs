//! Index construction: parallel block parsing, external merge and refinement

pub mod merge;
pub mod parse;
pub mod refine;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::thread;

use derivative::Derivative;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

pub use merge::{BlockMerger, MergedIndex};
pub use parse::{BlockIndex, BlockParser, ParseContext};
pub use refine::Refiner;

use crate::base::RecordSpan;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::index::{
    save_cbor, save_manifest, IndexManifest, PositionMap, BLOCKS_FOLDER, DOCUMENTS_FILE,
    FORMAT_VERSION, MANIFEST_FILE, MERGED_FILE, POSITIONS_FILE, POSTINGS_FILE, STATISTICS_FILE,
    TERMS_FILE,
};
use crate::registry::IdRegistry;
use crate::stats::CorpusStatistics;
use crate::text::Analyzer;
use crate::weights::WeightFunction;

/// Number of terms between two progress messages
pub(crate) const PROGRESS_STEP: usize = 25000;

const DEFAULT_PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(DEFAULT_PROGRESS_TEMPLATE)
        .progress_chars("=> ")
}

pub(crate) fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if visible {
        let progress = ProgressBar::new(len as u64);
        progress.set_style(pb_style());
        progress
    } else {
        ProgressBar::hidden()
    }
}

#[derive(Derivative, Clone, Debug)]
#[derivative(Default)]
pub struct BuilderOptions {
    /// Total number of term records held in memory by the merge (shared
    /// between all channels)
    #[derivative(Default(value = "2200"))]
    pub memory: usize,

    /// ID of the weighting function
    #[derivative(Default(value = "0"))]
    pub weight_function: u8,

    #[derivative(Default(value = "true"))]
    pub stemming: bool,

    /// Show progress bars while merging and refining
    #[derivative(Default(value = "false"))]
    pub progress: bool,
}

/// What a construction run produced
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub blocks: usize,
    pub documents: usize,
    pub terms: usize,
    pub tokens: usize,
    pub weight_function: WeightFunction,
}

/// Parses all the blocks, one thread per block
fn parse_blocks(context: &ParseContext, folder: &Path) -> Result<Vec<BlockIndex>> {
    let blocks = context.collection.blocks();
    let results: Vec<Result<BlockIndex>> = thread::scope(|scope| {
        let handles: Vec<_> = blocks
            .iter()
            .enumerate()
            .map(|(ix, block)| {
                let path = folder.join(format!("block-{}.dat", ix));
                scope.spawn(move || BlockParser::new(context, block, &path).run())
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(ix, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(Error::WorkerPanicked(ix)))
            })
            .collect()
    });

    results.into_iter().collect()
}

/// Removes what a failed construction left behind
fn remove_transient_files(folder: &Path) {
    let blocks_folder = folder.join(BLOCKS_FOLDER);
    if blocks_folder.exists() {
        if let Err(e) = fs::remove_dir_all(&blocks_folder) {
            warn!("Could not remove {}: {}", blocks_folder.display(), e);
        }
    }
    for name in [MERGED_FILE, POSTINGS_FILE] {
        let path = folder.join(name);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Parses, merges and refines the collection into the postings file
///
/// Returns the number of blocks and tokens, the corpus statistics and the
/// spans of the refined records.
fn build_postings(
    collection: &dyn Collection,
    registry: &IdRegistry,
    stopwords: &HashSet<String>,
    folder: &Path,
    options: &BuilderOptions,
    weight_function: WeightFunction,
    analyzer: Analyzer,
) -> Result<(usize, usize, CorpusStatistics, Vec<RecordSpan>)> {
    // Parsing
    let blocks_folder = folder.join(BLOCKS_FOLDER);
    fs::create_dir_all(&blocks_folder)?;
    let context = ParseContext {
        collection,
        registry,
        stopwords,
        analyzer,
        capacity: options.memory.max(1),
    };
    let blocks = parse_blocks(&context, &blocks_folder)?;
    let tokens: usize = blocks.iter().map(|block| block.tokens).sum();
    info!(
        "{} blocks parsed, {} tokens, {} terms",
        blocks.len(),
        tokens,
        registry.term_count()
    );

    // Merging
    let block_count = blocks.len();
    let merger = BlockMerger::new(
        blocks,
        &folder.join(MERGED_FILE),
        options.memory,
        collection.document_count(),
        options.progress,
    )?;
    let merged = merger.merge()?;
    fs::remove_dir_all(&blocks_folder)?;

    // Refining
    let refiner = Refiner::new(weight_function, &merged.statistics);
    let spans = refiner.refine(
        &merged,
        &folder.join(POSTINGS_FILE),
        options.memory,
        options.progress,
    )?;
    fs::remove_file(&merged.path)?;

    Ok((block_count, tokens, merged.statistics, spans))
}

/// Builds the index of a collection into `folder`
///
/// The registry must hold the collection's documents; terms are added while
/// parsing. The manifest is written last, so an interrupted run leaves an
/// index that cannot be loaded. Temporary files are removed when the
/// construction fails.
pub fn build_index(
    collection: &dyn Collection,
    registry: IdRegistry,
    stopwords: &HashSet<String>,
    folder: &Path,
    options: &BuilderOptions,
) -> Result<IndexSummary> {
    let weight_function = WeightFunction::from_id(options.weight_function)?;
    let analyzer = Analyzer::new(options.stemming);

    fs::create_dir_all(folder)?;
    let manifest_path = folder.join(MANIFEST_FILE);
    if manifest_path.exists() {
        debug!("Removing previous manifest {}", manifest_path.display());
        fs::remove_file(&manifest_path)?;
    }

    let built = build_postings(
        collection,
        &registry,
        stopwords,
        folder,
        options,
        weight_function,
        analyzer,
    );
    let (block_count, tokens, statistics, spans) = match built {
        Ok(built) => built,
        Err(e) => {
            remove_transient_files(folder);
            return Err(e);
        }
    };

    // Saving
    let positions = PositionMap::from_spans(spans);
    save_cbor(&folder.join(POSITIONS_FILE), &positions)?;
    save_cbor(&folder.join(STATISTICS_FILE), &statistics)?;

    let maps = registry.into_maps();
    let manifest = IndexManifest {
        version: FORMAT_VERSION,
        weight_function: weight_function.id(),
        analyzer,
        documents: maps.document_count(),
        terms: positions.len(),
    };
    save_cbor(&folder.join(TERMS_FILE), &maps.terms)?;
    save_cbor(&folder.join(DOCUMENTS_FILE), &maps.documents)?;
    save_manifest(folder, &manifest)?;

    info!(
        "Index built in {}: {} documents, {} terms",
        folder.display(),
        manifest.documents,
        manifest.terms
    );
    Ok(IndexSummary {
        blocks: block_count,
        documents: manifest.documents,
        terms: manifest.terms,
        tokens,
        weight_function,
    })
}
