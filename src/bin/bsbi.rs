use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use bsbi_index::builder::{build_index, BuilderOptions};
use bsbi_index::collection::DirectoryCollection;
use bsbi_index::index::Index;
use bsbi_index::registry::IdRegistry;
use bsbi_index::search::{search_boolean, search_vector, ScoredDocument, SearchOptions};
use bsbi_index::text::load_stopwords;
use bsbi_index::weights::WeightFunction;
use bsbi_index::Result;
use clap::{Parser, Subcommand};
use log::info;

#[derive(Parser)]
#[command(name = "bsbi")]
#[command(about = "Build and query a blocked sort-based inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index of a collection (one sub-directory per block)
    Build {
        collection: PathBuf,
        index: PathBuf,
        /// Weighting function ID (0-8)
        #[arg(long, default_value_t = 0)]
        weight: u8,
        /// Number of term records held in memory while merging
        #[arg(long, default_value_t = 2200)]
        memory: usize,
        /// File with one stopword per line
        #[arg(long)]
        stopwords: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        no_stemming: bool,
        /// Show progress bars
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
    /// Answer the queries read from the standard input, one per line
    Query {
        index: PathBuf,
        /// Queries are boolean CNF queries instead of free text
        #[arg(long, default_value_t = false)]
        boolean: bool,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Memory-map the postings
        #[arg(long, default_value_t = false)]
        in_memory: bool,
    },
    /// List the weighting functions
    Weights,
}

fn print_documents(out: &mut impl Write, index: &Index, documents: &[ScoredDocument]) -> io::Result<()> {
    for (rank, document) in documents.iter().enumerate() {
        writeln!(
            out,
            "{:>4} {:>10.4} {}",
            rank + 1,
            document.score,
            index.document(document.doc_id).unwrap_or("?")
        )?;
    }
    Ok(())
}

fn query(index: &Path, boolean: bool, options: &SearchOptions) -> Result<()> {
    let index = Index::load(index, options.in_memory)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        if boolean {
            let results = search_boolean(&index, &line)?;
            match &results.rejection {
                Some(rejection) => writeln!(out, "Rejected: {}", rejection)?,
                None => {
                    writeln!(out, "{} documents", results.documents.len())?;
                    print_documents(&mut out, &index, &results.documents)?;
                }
            }
        } else {
            let results = search_vector(&index, &line, options.top_k)?;
            writeln!(out, "{} documents", results.len())?;
            print_documents(&mut out, &index, results.first_page())?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            collection,
            index,
            weight,
            memory,
            stopwords,
            no_stemming,
            progress,
        } => {
            let stopwords = match stopwords {
                Some(path) => load_stopwords(&path)?,
                None => HashSet::new(),
            };
            let options = BuilderOptions {
                memory,
                weight_function: weight,
                stemming: !no_stemming,
                progress,
            };

            let mut registry = IdRegistry::new();
            let collection = DirectoryCollection::new(&collection, &mut registry)?;
            let summary = build_index(&collection, registry, &stopwords, &index, &options)?;
            info!(
                "{} documents and {} terms indexed with {}",
                summary.documents, summary.terms, summary.weight_function
            );
        }
        Commands::Query {
            index,
            boolean,
            top_k,
            in_memory,
        } => {
            let options = SearchOptions { top_k, in_memory };
            query(&index, boolean, &options)?;
        }
        Commands::Weights => {
            for function in WeightFunction::ALL {
                println!("{}", function);
            }
        }
    }
    Ok(())
}
