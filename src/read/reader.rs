use crate::error::{DemuxError, Result};
use crate::io::open_input;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// One 4-line sequencing record, line terminators stripped
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub head: Vec<u8>,
    pub seq: Vec<u8>,
    pub sep: Vec<u8>,
    pub qual: Vec<u8>,
}

impl Record {
    pub fn new(head: &[u8], seq: &[u8], sep: &[u8], qual: &[u8]) -> Self {
        Self {
            head: head.to_vec(),
            seq: seq.to_vec(),
            sep: sep.to_vec(),
            qual: qual.to_vec(),
        }
    }

    /// Write the four lines, each terminated by `\n`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for line in [&self.head, &self.seq, &self.sep, &self.qual] {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// What to do when the input ends in the middle of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Silently drop the partial record and end the stream
    #[default]
    Discard,
    /// Report the partial record as [`DemuxError::CorruptRecord`]
    Error,
}

/// Lazy, forward-only reader of 4-line records.
///
/// No FASTQ validation happens here: any four lines form a record and the
/// header and separator lines are passed through untouched.
pub struct RecordReader<R: BufRead> {
    inner: R,
    path: PathBuf,
    policy: TruncationPolicy,
    records: u64,
    finished: bool,
}

impl RecordReader<Box<dyn BufRead + Send>> {
    /// Open a plain or gzip compressed file
    pub fn open(path: &Path, policy: TruncationPolicy) -> Result<Self> {
        let inner = open_input(path)?;
        Ok(Self::new(inner, path, policy))
    }
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap an already opened stream, `path` is only used in error messages
    pub fn new(inner: R, path: &Path, policy: TruncationPolicy) -> Self {
        Self {
            inner,
            path: path.to_path_buf(),
            policy,
            records: 0,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of complete records yielded so far
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Read one line into `buf`, returns false at end of input
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<bool> {
        buf.clear();
        let n = self
            .inner
            .read_until(b'\n', buf)
            .map_err(|e| DemuxError::io(&self.path, "read", e))?;
        if n == 0 {
            return Ok(false);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(true)
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        let mut record = Record::default();
        if !self.read_line(&mut record.head)? {
            return Ok(None);
        }

        let mut lines = 1;
        for line in [&mut record.seq, &mut record.sep, &mut record.qual] {
            if !self.read_line(line)? {
                break;
            }
            lines += 1;
        }
        if lines == 4 {
            self.records += 1;
            return Ok(Some(record));
        }

        match self.policy {
            TruncationPolicy::Discard => {
                log::debug!(
                    "Discarding partial record after {} complete records in {} ({} of 4 lines)",
                    self.records,
                    self.path.display(),
                    lines
                );
                Ok(None)
            }
            TruncationPolicy::Error => Err(DemuxError::CorruptRecord {
                path: self.path.clone(),
                record: self.records + 1,
                lines,
            }),
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
