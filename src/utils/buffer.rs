//! Random access to the records of an index file

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::base::RecordSpan;
use crate::error::{Error, Result};

/// Reads record spans, one batch of lookups at a time
pub trait SpanSource {
    fn read(&mut self, span: &RecordSpan) -> Result<&[u8]>;
}

pub trait Buffer: Send + Sync {
    /// Opens a source for a batch of reads
    fn source(&self) -> Result<Box<dyn SpanSource + '_>>;
}

fn out_of_bounds(span: &RecordSpan, size: usize) -> Error {
    Error::decode(format!("record {} goes past the end of the file ({})", span, size))
}

struct SliceSource<'a> {
    data: &'a [u8],
}

impl SpanSource for SliceSource<'_> {
    fn read(&mut self, span: &RecordSpan) -> Result<&[u8]> {
        let start = span.offset as usize;
        let end = span.end() as usize;
        if end > self.data.len() {
            return Err(out_of_bounds(span, self.data.len()));
        }
        Ok(&self.data[start..end])
    }
}

/// Seeks a file handle for each record
pub struct FileBuffer {
    path: PathBuf,
}

impl FileBuffer {
    pub fn new(path: &Path) -> Result<Self> {
        // Fails early if the file is missing
        File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

struct FileSource {
    file: File,
    scratch: Vec<u8>,
}

impl SpanSource for FileSource {
    fn read(&mut self, span: &RecordSpan) -> Result<&[u8]> {
        self.file.seek(SeekFrom::Start(span.offset))?;
        self.scratch.resize(span.length as usize, 0);
        self.file.read_exact(&mut self.scratch).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::decode(format!("record {} is truncated", span))
            } else {
                Error::Io(e)
            }
        })?;
        Ok(&self.scratch)
    }
}

impl Buffer for FileBuffer {
    fn source(&self) -> Result<Box<dyn SpanSource + '_>> {
        // One handle per batch, so that concurrent searches never share a
        // file cursor
        Ok(Box::new(FileSource {
            file: File::open(&self.path)?,
            scratch: Vec::new(),
        }))
    }
}

/// Stores the data in memory
pub struct MemoryBuffer {
    data: Vec<u8>,
}

impl MemoryBuffer {
    pub fn new(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Self { data })
    }
}

impl Buffer for MemoryBuffer {
    fn source(&self) -> Result<Box<dyn SpanSource + '_>> {
        Ok(Box::new(SliceSource { data: &self.data }))
    }
}

/// Uses a memory map
pub struct MmapBuffer {
    mmap: Option<Mmap>,
}

impl MmapBuffer {
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // Empty files cannot be mapped
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().map(&file)? })
        };
        Ok(Self { mmap })
    }
}

impl Buffer for MmapBuffer {
    fn source(&self) -> Result<Box<dyn SpanSource + '_>> {
        let data: &[u8] = match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        };
        Ok(Box::new(SliceSource { data }))
    }
}
