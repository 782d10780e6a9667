use crate::error::{DemuxError, Result};
use crate::read::TruncationPolicy;
use crate::trim::TrimPolicy;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One input file for single-end data, two for paired-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLayout {
    SingleEnd(PathBuf),
    PairedEnd(PathBuf, PathBuf),
}

impl InputLayout {
    pub fn is_paired(&self) -> bool {
        matches!(self, InputLayout::PairedEnd(..))
    }

    pub fn paths(&self) -> Vec<&Path> {
        match self {
            InputLayout::SingleEnd(p) => vec![p.as_path()],
            InputLayout::PairedEnd(r1, r2) => vec![r1.as_path(), r2.as_path()],
        }
    }
}

impl FromStr for InputLayout {
    type Err = DemuxError;

    /// `reads.fq` or `r1.fq,r2.fq`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        match parts.as_slice() {
            [single] => Ok(InputLayout::SingleEnd(PathBuf::from(single))),
            [r1, r2] => Ok(InputLayout::PairedEnd(PathBuf::from(r1), PathBuf::from(r2))),
            _ => Err(DemuxError::InputCount(parts.len())),
        }
    }
}

/// Everything a demultiplexing run needs, already checked by the caller
#[derive(Debug, Clone)]
pub struct DemuxConfig {
    pub input: InputLayout,
    pub barcodes: PathBuf,
    pub output_dir: PathBuf,
    pub trim: TrimPolicy,
    pub truncation: TruncationPolicy,
    /// Per-sample read counts are written here as TSV when set
    pub stats: Option<PathBuf>,
    pub progress: bool,
}

impl DemuxConfig {
    pub fn new(input: InputLayout, barcodes: impl Into<PathBuf>) -> Self {
        Self {
            input,
            barcodes: barcodes.into(),
            output_dir: PathBuf::from("."),
            trim: TrimPolicy::default(),
            truncation: TruncationPolicy::default(),
            stats: None,
            progress: false,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_trim(mut self, trim: TrimPolicy) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn with_stats(mut self, stats: Option<PathBuf>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn check_output_dir(&self) -> Result<()> {
        if self.output_dir.is_dir() {
            Ok(())
        } else {
            Err(DemuxError::MissingOutputDirectory(self.output_dir.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_end() {
        let layout: InputLayout = "reads.fq.gz".parse().unwrap();
        assert_eq!(layout, InputLayout::SingleEnd(PathBuf::from("reads.fq.gz")));
        assert!(!layout.is_paired());
    }

    #[test]
    fn test_parse_paired_end() {
        let layout: InputLayout = "R1.fq.gz, R2.fq.gz".parse().unwrap();
        assert_eq!(
            layout,
            InputLayout::PairedEnd(PathBuf::from("R1.fq.gz"), PathBuf::from("R2.fq.gz"))
        );
        assert!(layout.is_paired());
        assert_eq!(layout.paths().len(), 2);
    }

    #[test]
    fn test_parse_wrong_count() {
        assert!(matches!(
            "a.fq,b.fq,c.fq".parse::<InputLayout>(),
            Err(DemuxError::InputCount(3))
        ));
        assert!(matches!(
            ",".parse::<InputLayout>(),
            Err(DemuxError::InputCount(0))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = DemuxConfig::new(InputLayout::SingleEnd("r.fq".into()), "bc.txt");
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.trim, TrimPolicy::SeqAndQual);
        assert_eq!(config.truncation, TruncationPolicy::Discard);
        assert!(config.stats.is_none());
        assert!(config.check_output_dir().is_ok());
    }

    #[test]
    fn test_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = DemuxConfig::new(InputLayout::SingleEnd("r.fq".into()), "bc.txt")
            .with_output_dir(dir.path().join("nope"));
        assert!(matches!(
            config.check_output_dir(),
            Err(DemuxError::MissingOutputDirectory(_))
        ));
    }
}
