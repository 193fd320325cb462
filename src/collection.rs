//! Document collections split into blocks
//!
//! Document IDs are assigned block after block when the collection is
//! enumerated, so a block's documents have increasing IDs and two blocks
//! never share a document.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::base::{DocId, Len};
use crate::error::{Error, Result};
use crate::registry::IdRegistry;

/// A partition of the collection, parsed by one worker
#[derive(Clone, Debug)]
pub struct Block {
    pub name: String,
    pub documents: Vec<DocId>,
}

impl Len for Block {
    fn len(&self) -> usize {
        self.documents.len()
    }
}

pub trait Collection: Sync {
    /// Ordered blocks of document IDs
    fn blocks(&self) -> &[Block];

    /// Opens the text of a document
    fn open(&self, doc_id: DocId) -> Result<Box<dyn Read + '_>>;

    fn document_count(&self) -> usize {
        self.blocks().iter().map(|block| block.len()).sum()
    }
}

/// Reads the whole text of a document
pub fn read_document(collection: &dyn Collection, doc_id: DocId) -> Result<String> {
    let mut bytes = Vec::new();
    collection.open(doc_id)?.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Each sub-directory of the root is a block, each file inside a document
pub struct DirectoryCollection {
    root: PathBuf,
    blocks: Vec<Block>,
    paths: HashMap<DocId, PathBuf>,
}

/// Sorted entries of a directory
fn sorted_entries(path: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

impl DirectoryCollection {
    pub fn new(root: &Path, registry: &mut IdRegistry) -> Result<Self> {
        info!("Building collection {}", root.display());
        let mut blocks = Vec::new();
        let mut paths = HashMap::new();

        for block_path in sorted_entries(root)? {
            if !block_path.is_dir() {
                warn!("Ignoring {} (not a block directory)", block_path.display());
                continue;
            }

            let mut documents = Vec::new();
            for document_path in sorted_entries(&block_path)? {
                if !document_path.is_file() {
                    continue;
                }
                let doc_id = registry.add_document(document_path.display().to_string());
                documents.push(doc_id);
                paths.insert(doc_id, document_path);
            }

            blocks.push(Block {
                name: block_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| block_path.display().to_string()),
                documents,
            });
        }

        info!(
            "{} blocks detected, {} documents detected",
            blocks.len(),
            paths.len()
        );
        Ok(Self {
            root: root.to_path_buf(),
            blocks,
            paths,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Collection for DirectoryCollection {
    fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn open(&self, doc_id: DocId) -> Result<Box<dyn Read + '_>> {
        let path = self.paths.get(&doc_id).ok_or_else(|| Error::MissingDocument {
            doc_id,
            locator: String::from("<unregistered>"),
            source: std::io::ErrorKind::NotFound.into(),
        })?;

        let file = File::open(path).map_err(|source| Error::MissingDocument {
            doc_id,
            locator: path.display().to_string(),
            source,
        })?;
        Ok(Box::new(file))
    }
}

/// Documents held in memory, mostly useful for tests
pub struct MemoryCollection {
    blocks: Vec<Block>,
    texts: HashMap<DocId, String>,
}

impl MemoryCollection {
    /// Registers the documents of each block, in order
    pub fn new<B, D, S>(blocks: B, registry: &mut IdRegistry) -> Self
    where
        B: IntoIterator<Item = D>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut texts = HashMap::new();
        let blocks = blocks
            .into_iter()
            .enumerate()
            .map(|(block_ix, documents)| {
                let documents = documents
                    .into_iter()
                    .enumerate()
                    .map(|(ix, text)| {
                        let doc_id = registry.add_document(format!("block-{}/doc-{}", block_ix, ix));
                        texts.insert(doc_id, text.into());
                        doc_id
                    })
                    .collect();
                Block {
                    name: format!("block-{}", block_ix),
                    documents,
                }
            })
            .collect();

        Self { blocks, texts }
    }
}

impl Collection for MemoryCollection {
    fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn open(&self, doc_id: DocId) -> Result<Box<dyn Read + '_>> {
        match self.texts.get(&doc_id) {
            Some(text) => Ok(Box::new(text.as_bytes())),
            None => Err(Error::MissingDocument {
                doc_id,
                locator: format!("memory:{}", doc_id),
                source: std::io::ErrorKind::NotFound.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use temp_dir::TempDir;

    use super::*;

    #[test]
    fn test_directory_collection() {
        let dir = TempDir::new().expect("Could not create temporary directory");
        for (block, name, text) in [("0", "b.txt", "dog bird"), ("0", "a.txt", "cat dog"), ("1", "c.txt", "cat")] {
            let block_dir = dir.path().join(block);
            fs::create_dir_all(&block_dir).unwrap();
            fs::write(block_dir.join(name), text).unwrap();
        }
        fs::write(dir.path().join("README"), "not a block").unwrap();

        let mut registry = IdRegistry::new();
        let collection = DirectoryCollection::new(dir.path(), &mut registry).unwrap();

        assert_eq!(collection.blocks().len(), 2);
        assert_eq!(collection.blocks()[0].documents, vec![1, 2]);
        assert_eq!(collection.blocks()[1].documents, vec![3]);
        assert_eq!(collection.document_count(), 3);

        // Files are sorted by name within a block
        assert!(registry.document(1).unwrap().ends_with("a.txt"));
        assert_eq!(read_document(&collection, 2).unwrap(), "dog bird");
    }

    #[test]
    fn test_missing_document() {
        let mut registry = IdRegistry::new();
        let collection = MemoryCollection::new(vec![vec!["a b"]], &mut registry);
        assert_eq!(read_document(&collection, 1).unwrap(), "a b");
        assert!(matches!(
            read_document(&collection, 2),
            Err(Error::MissingDocument { doc_id: 2, .. })
        ));
    }
}
