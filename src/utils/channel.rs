//! Capacity-bounded sequential access to sorted record files
//!
//! Both ends hold at most `capacity` decoded records in memory, whatever the
//! size of the underlying file.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::base::{RecordSpan, TermRecord};
use crate::codec::{self, PostingFormat};
use crate::error::{Error, Result};

/// Reads records in order, prefetching up to `capacity` of them
pub struct SequentialReader<P: PostingFormat> {
    path: PathBuf,
    file: BufReader<File>,

    /// Current position in the file
    position: u64,

    /// Records not read yet from disk
    spans: VecDeque<RecordSpan>,

    /// Prefetched records
    queue: VecDeque<TermRecord<P>>,
    capacity: usize,
}

impl<P: PostingFormat> SequentialReader<P> {
    /// Opens a reader over all the records described by `spans`
    pub fn open<I>(path: &Path, spans: I, capacity: usize) -> Result<Self>
    where
        I: IntoIterator<Item = RecordSpan>,
    {
        Self::open_at(path, spans, 0, capacity)
    }

    /// Opens a reader that resumes at `offset`: records starting before it
    /// are skipped
    pub fn open_at<I>(path: &Path, spans: I, offset: u64, capacity: usize) -> Result<Self>
    where
        I: IntoIterator<Item = RecordSpan>,
    {
        assert!(capacity > 0, "A reader needs room for at least one record");

        let spans: VecDeque<RecordSpan> = spans
            .into_iter()
            .filter(|span| span.offset >= offset)
            .collect();

        let mut file = BufReader::new(File::open(path)?);
        file.seek(SeekFrom::Start(offset))?;

        let mut reader = Self {
            path: path.to_path_buf(),
            file,
            position: offset,
            spans,
            queue: VecDeque::with_capacity(capacity),
            capacity,
        };
        reader.fill()?;
        Ok(reader)
    }

    /// Reads records from disk until the queue is full or the file is over
    fn fill(&mut self) -> Result<()> {
        let mut bytes = Vec::new();
        while self.queue.len() < self.capacity {
            let span = match self.spans.pop_front() {
                Some(span) => span,
                None => break,
            };

            if span.offset != self.position {
                self.file.seek(SeekFrom::Start(span.offset))?;
            }

            bytes.resize(span.length as usize, 0);
            self.file.read_exact(&mut bytes).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::decode(format!(
                        "{} ends before the record {}",
                        self.path.display(),
                        span
                    ))
                } else {
                    Error::Io(e)
                }
            })?;
            self.position = span.end();

            let record: TermRecord<P> = codec::decode(&bytes)?;
            if record.term_id != span.term_id {
                return Err(Error::decode(format!(
                    "expected term {} at {}, found {}",
                    span.term_id, span.offset, record.term_id
                )));
            }
            self.queue.push_back(record);
        }

        debug!(
            "[{}] {} records buffered, {} left on disk",
            self.path.display(),
            self.queue.len(),
            self.spans.len()
        );
        Ok(())
    }

    /// Returns the next record without consuming it
    pub fn peek(&self) -> Option<&TermRecord<P>> {
        self.queue.front()
    }

    /// Consumes the next record, refilling the queue when it is drained
    pub fn pop(&mut self) -> Result<Option<TermRecord<P>>> {
        let record = self.queue.pop_front();
        if self.queue.is_empty() {
            self.fill()?;
        }
        Ok(record)
    }

    /// Number of records held in memory
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    /// Number of records not consumed yet
    pub fn remaining(&self) -> usize {
        self.queue.len() + self.spans.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<P: PostingFormat> Iterator for SequentialReader<P> {
    type Item = Result<TermRecord<P>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop().transpose()
    }
}

/// Buffers up to `capacity` records before appending them to the file
pub struct SequentialWriter<P: PostingFormat> {
    path: PathBuf,
    file: BufWriter<File>,
    buffer: Vec<TermRecord<P>>,
    capacity: usize,

    /// Where each written record lives
    spans: Vec<RecordSpan>,
    position: u64,
}

impl<P: PostingFormat> SequentialWriter<P> {
    /// Creates the file (truncating any previous content)
    pub fn create(path: &Path, capacity: usize) -> Result<Self> {
        assert!(capacity > 0, "A writer needs room for at least one record");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(File::create(path)?),
            buffer: Vec::with_capacity(capacity),
            capacity,
            spans: Vec::new(),
            position: 0,
        })
    }

    pub fn append(&mut self, record: TermRecord<P>) -> Result<()> {
        debug_assert!(
            self.buffer
                .last()
                .map(|r| r.term_id)
                .or(self.spans.last().map(|s| s.term_id))
                .map_or(true, |last| last < record.term_id),
            "Records should be written with increasing term IDs"
        );

        self.buffer.push(record);
        if self.buffer.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        debug!(
            "[{}] Flushing {} records at {}",
            self.path.display(),
            self.buffer.len(),
            self.position
        );
        for record in self.buffer.drain(..) {
            let length = codec::encode_into(&record, &mut self.file)?;
            self.spans.push(RecordSpan {
                term_id: record.term_id,
                offset: self.position,
                length,
            });
            self.position += length;
        }
        self.file.flush()?;
        Ok(())
    }

    /// Flushes the remaining records and returns the position of every
    /// written record
    pub fn close(mut self) -> Result<Vec<RecordSpan>> {
        self.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(self.spans)
    }

    /// Number of records held in memory
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
