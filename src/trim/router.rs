use crate::barcodes::SampleOutputs;
use crate::error::{DemuxError, Result};
use crate::io::create_output;
use crate::read::Record;
use crate::search::MatchResult;
use crate::trim::TrimPolicy;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

struct Channel {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Channel {
    fn create(path: PathBuf) -> Result<Self> {
        let writer = create_output(&path)?;
        Ok(Self { path, writer })
    }

    fn write(&mut self, record: &Record) -> Result<()> {
        record
            .write_to(&mut self.writer)
            .map_err(|e| DemuxError::io(&self.path, "write", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| DemuxError::io(&self.path, "flush", e))
    }
}

struct SampleChannels {
    r1: Channel,
    r2: Option<Channel>,
    records: u64,
}

/// Per-sample output files for one run.
///
/// Every file is truncated when the router is opened and then kept open as a
/// single buffered handle until [`RecordRouter::finish`]. Records are written
/// line by line into the buffers, so a file only holds whole records once
/// `finish` has flushed it.
pub struct RecordRouter {
    samples: Vec<SampleChannels>,
    policy: TrimPolicy,
}

impl RecordRouter {
    /// Create `<sample>_R1.fq` (and `<sample>_R2.fq` when `paired`) in `dir` for every sample
    pub fn open(outputs: &SampleOutputs, dir: &Path, paired: bool, policy: TrimPolicy) -> Result<Self> {
        let mut samples = Vec::with_capacity(outputs.len());
        for sample in outputs.iter() {
            let r1 = Channel::create(sample.r1_path(dir))?;
            let r2 = if paired {
                Some(Channel::create(sample.r2_path(dir))?)
            } else {
                None
            };
            samples.push(SampleChannels { r1, r2, records: 0 });
        }
        log::debug!(
            "Opened {} output files in {}",
            samples.len() * if paired { 2 } else { 1 },
            dir.display()
        );
        Ok(Self { samples, policy })
    }

    /// Records (or pairs) written for a sample so far
    pub fn records_written(&self, sample_id: usize) -> u64 {
        self.samples.get(sample_id).map_or(0, |s| s.records)
    }

    fn sample_mut(&mut self, sample_id: usize) -> Result<&mut SampleChannels> {
        self.samples.get_mut(sample_id).ok_or_else(|| {
            DemuxError::io(
                Path::new("<router>"),
                "route",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no output files for sample #{sample_id}"),
                ),
            )
        })
    }

    /// Trim a single-end read and append it to the sample's R1 file
    pub fn route_single(&mut self, mut record: Record, hit: &MatchResult<'_>) -> Result<()> {
        self.policy.apply(&mut record, hit.trim_offset_r1);
        let sample = self.sample_mut(hit.sample_id)?;
        sample.r1.write(&record)?;
        sample.records += 1;
        Ok(())
    }

    /// Trim both mates and append them to the sample's R1 and R2 files
    pub fn route_pair(&mut self, mut r1: Record, mut r2: Record, hit: &MatchResult<'_>) -> Result<()> {
        let policy = self.policy;
        policy.apply(&mut r1, hit.trim_offset_r1);
        policy.apply(&mut r2, hit.trim_offset_r2.unwrap_or(0));

        let sample = self.sample_mut(hit.sample_id)?;
        let Some(r2_out) = sample.r2.as_mut() else {
            return Err(DemuxError::io(
                &sample.r1.path,
                "route",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "paired record routed to single-end outputs",
                ),
            ));
        };
        r2_out.write(&r2)?;
        sample.r1.write(&r1)?;
        sample.records += 1;
        Ok(())
    }

    /// Flush every output file, reporting the first failure
    pub fn finish(mut self) -> Result<()> {
        for sample in &mut self.samples {
            sample.r1.flush()?;
            if let Some(r2) = sample.r2.as_mut() {
                r2.flush()?;
            }
        }
        Ok(())
    }
}
