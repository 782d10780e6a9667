use crate::error::{DemuxError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One barcode pair and the sample it belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarcodeEntry {
    pub forward: Vec<u8>,
    pub reverse: Vec<u8>,
    pub sample: String,
    /// Index of `sample` in [`SampleOutputs`]
    pub sample_id: usize,
}

/// Barcode pairs in file order.
///
/// Order matters: matching walks the entries front to back and stops at the
/// first hit, so this is a `Vec` and never iterated through a hash map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BarcodeTable {
    entries: Vec<BarcodeEntry>,
}

impl BarcodeTable {
    pub fn entries(&self) -> &[BarcodeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a barcode file from disk
    pub fn parse(path: &Path) -> Result<(Self, SampleOutputs)> {
        let file = File::open(path).map_err(|e| DemuxError::io(path, "open", e))?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Parse `sample<TAB>forward[<TAB>reverse]` lines.
    ///
    /// A repeated `(forward, reverse)` key takes the sample of the later line
    /// but keeps the position of the first one.
    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<(Self, SampleOutputs)> {
        let mut entries: Vec<BarcodeEntry> = Vec::new();
        let mut key_index: HashMap<(Vec<u8>, Vec<u8>), usize> = HashMap::new();
        let mut outputs = SampleOutputs::default();

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DemuxError::io(path, "read", e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            let (sample, forward, reverse) = match fields.as_slice() {
                [sample, forward] => (*sample, *forward, ""),
                [sample, forward, reverse] => (*sample, *forward, *reverse),
                _ => {
                    return Err(DemuxError::MalformedBarcodeFile {
                        path: path.to_path_buf(),
                        line: i + 1,
                        fields: fields.len(),
                    })
                }
            };

            let sample_id = outputs.insert(sample);
            let key = (forward.as_bytes().to_vec(), reverse.as_bytes().to_vec());

            if let Some(&idx) = key_index.get(&key) {
                let entry = &mut entries[idx];
                if entry.sample != sample {
                    log::warn!(
                        "Barcode pair {forward}/{reverse} on line {} reassigned from {} to {sample}",
                        i + 1,
                        entry.sample
                    );
                }
                entry.sample = sample.to_string();
                entry.sample_id = sample_id;
            } else {
                key_index.insert(key.clone(), entries.len());
                entries.push(BarcodeEntry {
                    forward: key.0,
                    reverse: key.1,
                    sample: sample.to_string(),
                    sample_id,
                });
            }
        }

        if entries.is_empty() {
            log::warn!("No barcodes found in {}", path.display());
        }

        Ok((Self { entries }, outputs))
    }
}

/// Output file names for one sample
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleOutput {
    pub name: String,
    pub r1: String,
    pub r2: String,
}

impl SampleOutput {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            r1: format!("{name}_R1.fq"),
            r2: format!("{name}_R2.fq"),
        }
    }

    pub fn r1_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.r1)
    }

    pub fn r2_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.r2)
    }
}

/// Distinct samples in order of first appearance
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleOutputs {
    samples: Vec<SampleOutput>,
    ids: HashMap<String, usize>,
}

impl SampleOutputs {
    fn insert(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.samples.len();
        self.samples.push(SampleOutput::new(name));
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, sample_id: usize) -> Option<&SampleOutput> {
        self.samples.get(sample_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleOutput> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
