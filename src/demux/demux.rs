use crate::barcodes::{BarcodeTable, SampleOutputs};
use crate::config::{DemuxConfig, InputLayout};
use crate::error::{DemuxError, Result};
use crate::progress::RunProgress;
use crate::read::{Record, RecordReader};
use crate::search::{BarcodeMatcher, Orientation};
use crate::trim::RecordRouter;
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;

type Reader = RecordReader<Box<dyn BufRead + Send>>;

enum Inputs {
    Single(Reader),
    Paired(Reader, Reader),
}

/// Reads routed to one sample, one row of the statistics file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleCount {
    pub sample: String,
    pub reads: u64,
    pub r1_file: String,
    pub r2_file: Option<String>,
}

/// Outcome of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemuxStats {
    pub paired: bool,
    /// Records read, pairs count once
    pub total: u64,
    pub matched: u64,
    pub unmatched: u64,
    pub forward: u64,
    pub swapped: u64,
    /// Samples in barcode file order, including those that got nothing
    pub per_sample: Vec<SampleCount>,
    /// The two paired inputs held a different number of records
    pub mate_count_mismatch: bool,
}

impl DemuxStats {
    fn record(&mut self, orientation: Option<Orientation>) {
        self.total += 1;
        match orientation {
            Some(Orientation::Forward) => {
                self.matched += 1;
                self.forward += 1;
            }
            Some(Orientation::Swapped) => {
                self.matched += 1;
                self.swapped += 1;
            }
            None => self.unmatched += 1,
        }
    }

    /// Write per-sample counts as TSV, with a trailing `unmatched` row
    pub fn write_tsv(&self, path: &Path) -> Result<()> {
        let to_io = |e: csv::Error| DemuxError::io(path, "write", e.into());

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .map_err(to_io)?;
        for row in &self.per_sample {
            writer.serialize(row).map_err(to_io)?;
        }
        writer
            .serialize(SampleCount {
                sample: "unmatched".to_string(),
                reads: self.unmatched,
                r1_file: String::new(),
                r2_file: None,
            })
            .map_err(to_io)?;
        writer
            .flush()
            .map_err(|e| DemuxError::io(path, "flush", e))
    }
}

/// Drives reading, matching and routing for one run.
///
/// [`Demultiplexer::new`] does all the setup (barcode table, inputs, truncated
/// outputs) and [`Demultiplexer::run`] consumes it, so a finished run cannot
/// be resumed or repeated.
pub struct Demultiplexer {
    state: RunState,
    inputs: Inputs,
    outputs: SampleOutputs,
}

struct RunState {
    matcher: BarcodeMatcher,
    router: RecordRouter,
    progress: RunProgress,
    stats: DemuxStats,
}

impl Demultiplexer {
    pub fn new(config: &DemuxConfig) -> Result<Self> {
        log::info!("Loading barcode file {}", config.barcodes.display());
        let (table, outputs) = BarcodeTable::parse(&config.barcodes)?;
        log::info!(
            "Loaded {} barcode pairs for {} samples",
            table.len(),
            outputs.len()
        );

        config.check_output_dir()?;

        let inputs = match &config.input {
            InputLayout::SingleEnd(path) => {
                log::info!("Input 1 file, using single-end mode");
                Inputs::Single(RecordReader::open(path, config.truncation)?)
            }
            InputLayout::PairedEnd(r1, r2) => {
                log::info!("Input 2 files, using paired-end mode");
                Inputs::Paired(
                    RecordReader::open(r1, config.truncation)?,
                    RecordReader::open(r2, config.truncation)?,
                )
            }
        };

        let router = RecordRouter::open(
            &outputs,
            &config.output_dir,
            config.input.is_paired(),
            config.trim,
        )?;

        let state = RunState {
            matcher: BarcodeMatcher::new(&table),
            router,
            progress: RunProgress::new(config.progress),
            stats: DemuxStats {
                paired: config.input.is_paired(),
                ..DemuxStats::default()
            },
        };
        Ok(Self {
            state,
            inputs,
            outputs,
        })
    }

    /// Process every input record, then flush and close all outputs
    pub fn run(self) -> Result<DemuxStats> {
        let Self {
            mut state,
            inputs,
            outputs,
        } = self;
        match inputs {
            Inputs::Single(reader) => state.run_single_end(reader)?,
            Inputs::Paired(r1, r2) => state.run_paired_end(r1, r2)?,
        }
        state.finish(&outputs)
    }
}

impl RunState {
    fn run_single_end(&mut self, reader: Reader) -> Result<()> {
        log::info!("Processing file {}", reader.path().display());
        for record in reader {
            let record = record?;
            let orientation = match self.matcher.match_single(&record) {
                Some(hit) => {
                    let orientation = hit.orientation;
                    self.router.route_single(record, &hit)?;
                    Some(orientation)
                }
                None => {
                    log_unmatched(&record);
                    None
                }
            };
            self.stats.record(orientation);
            self.progress.update(self.stats.total, self.stats.matched);
        }
        Ok(())
    }

    fn run_paired_end(&mut self, mut r1: Reader, mut r2: Reader) -> Result<()> {
        log::info!(
            "Processing files {},{}",
            r1.path().display(),
            r2.path().display()
        );
        loop {
            let rec1 = r1.next().transpose()?;
            let rec2 = r2.next().transpose()?;
            let (rec1, rec2) = match (rec1, rec2) {
                (Some(a), Some(b)) => (a, b),
                (None, None) => break,
                (a, _) => {
                    let (longer, shorter) = if a.is_some() { (&r1, &r2) } else { (&r2, &r1) };
                    log::warn!(
                        "{} ended after {} records but {} has more, remaining records are ignored",
                        shorter.path().display(),
                        shorter.records_read(),
                        longer.path().display()
                    );
                    self.stats.mate_count_mismatch = true;
                    break;
                }
            };

            let orientation = match self.matcher.match_pair(&rec1, &rec2) {
                Some(hit) => {
                    let orientation = hit.orientation;
                    self.router.route_pair(rec1, rec2, &hit)?;
                    Some(orientation)
                }
                None => {
                    log_unmatched(&rec1);
                    None
                }
            };
            self.stats.record(orientation);
            self.progress.update(self.stats.total, self.stats.matched);
        }
        Ok(())
    }

    fn finish(self, outputs: &SampleOutputs) -> Result<DemuxStats> {
        let Self {
            router,
            progress,
            mut stats,
            ..
        } = self;

        progress.finish(stats.total, stats.matched);
        let paired = stats.paired;
        stats.per_sample = outputs
            .iter()
            .enumerate()
            .map(|(id, sample)| SampleCount {
                sample: sample.name.clone(),
                reads: router.records_written(id),
                r1_file: sample.r1.clone(),
                r2_file: paired.then(|| sample.r2.clone()),
            })
            .collect();
        router.finish()?;

        log::info!(
            "Done! {} of {} {} matched a barcode, {} unmatched",
            stats.matched,
            stats.total,
            if stats.paired { "pairs" } else { "reads" },
            stats.unmatched
        );
        Ok(stats)
    }
}

fn log_unmatched(record: &Record) {
    log::debug!(
        "No barcode found for {}",
        String::from_utf8_lossy(&record.head)
    );
}

/// Run a full demultiplexing job and write the statistics file if requested
pub fn demultiplex(config: &DemuxConfig) -> Result<DemuxStats> {
    let stats = Demultiplexer::new(config)?.run()?;
    if let Some(path) = &config.stats {
        stats.write_tsv(path)?;
        log::info!("Wrote statistics to {}", path.display());
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::TruncationPolicy;
    use crate::trim::TrimPolicy;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        out: PathBuf,
    }

    impl Fixture {
        fn new(barcodes: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("barcodes.txt"), barcodes).unwrap();
            let out = dir.path().join("out");
            std::fs::create_dir(&out).unwrap();
            Self { dir, out }
        }

        fn input(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn gz_input(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(content.as_bytes()).unwrap();
            std::fs::write(&path, encoder.finish().unwrap()).unwrap();
            path
        }

        fn config(&self, input: InputLayout) -> DemuxConfig {
            DemuxConfig::new(input, self.dir.path().join("barcodes.txt")).with_output_dir(&self.out)
        }

        fn output(&self, name: &str) -> String {
            std::fs::read_to_string(self.out.join(name)).unwrap()
        }
    }

    fn fq(name: &str, seq: &str) -> String {
        format!("@{name}\n{seq}\n+\n{}\n", "I".repeat(seq.len()))
    }

    #[test]
    fn test_single_end_scenario() {
        let fx = Fixture::new("S1\tACGT\tTGCA\n");
        let input = fx.input("reads.fq", "@r1\nGGACGTAAAA\n+\nIIIIIIIIII\n");

        let stats = demultiplex(&fx.config(InputLayout::SingleEnd(input))).unwrap();

        assert_eq!(fx.output("S1_R1.fq"), "@r1\nACGTAAAA\n+\nIIIIIIII\n");
        assert!(!fx.out.join("S1_R2.fq").exists());
        assert_eq!(stats.total, 1);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.per_sample[0].reads, 1);
    }

    #[test]
    fn test_unmatched_reads_are_dropped() {
        let fx = Fixture::new("S1\tACGT\nS2\tCCCC\n");
        let reads = [fq("a", "TTTTTTTT"), fq("b", "GGACGTGG"), fq("c", "AAAAAAAA")].concat();
        let input = fx.input("reads.fq", &reads);

        let stats = demultiplex(&fx.config(InputLayout::SingleEnd(input))).unwrap();

        assert_eq!(fx.output("S1_R1.fq"), fq("b", "ACGTGG"));
        assert_eq!(fx.output("S2_R1.fq"), "");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.unmatched, 2);
    }

    #[test]
    fn test_first_table_entry_wins() {
        let fx = Fixture::new("A\tCCCC\nB\tGGGG\n");
        let input = fx.input("reads.fq", &fq("r", "GGGGTTCCCCTT"));

        demultiplex(&fx.config(InputLayout::SingleEnd(input))).unwrap();

        assert_eq!(fx.output("A_R1.fq"), "@r\nCCCCTT\n+\nIIIIII\n");
        assert_eq!(fx.output("B_R1.fq"), "");
    }

    #[test]
    fn test_seq_only_policy_keeps_quality() {
        let fx = Fixture::new("S1\tACGT\n");
        let input = fx.input("reads.fq", "@r1\nGGACGT\n+\n123456\n");

        let config = fx.config(InputLayout::SingleEnd(input)).with_trim(TrimPolicy::SeqOnly);
        demultiplex(&config).unwrap();

        assert_eq!(fx.output("S1_R1.fq"), "@r1\nACGT\n+\n123456\n");
    }

    #[test]
    fn test_paired_end_both_orientations() {
        let fx = Fixture::new("S1\tAAAA\tCCCC\nS2\tGGGG\tTTTT\n");
        let r1 = [fq("p1", "GGCCCCGG"), fq("p2", "TAAAAT"), fq("p3", "ACACAC")].concat();
        let r2 = [fq("p1", "TAAAAT"), fq("p2", "GGCCCCGG"), fq("p3", "ACACAC")].concat();
        let input = InputLayout::PairedEnd(fx.input("r1.fq", &r1), fx.input("r2.fq", &r2));

        let stats = demultiplex(&fx.config(input)).unwrap();

        assert_eq!(
            fx.output("S1_R1.fq"),
            [fq("p1", "CCCCGG"), fq("p2", "AAAAT")].concat()
        );
        assert_eq!(
            fx.output("S1_R2.fq"),
            [fq("p1", "AAAAT"), fq("p2", "CCCCGG")].concat()
        );
        assert_eq!(fx.output("S2_R1.fq"), "");
        assert_eq!(fx.output("S2_R2.fq"), "");
        assert_eq!(stats.forward, 1);
        assert_eq!(stats.swapped, 1);
        assert_eq!(stats.unmatched, 1);
        assert!(!stats.mate_count_mismatch);
    }

    #[test]
    fn test_paired_end_stops_at_shorter_input() {
        let fx = Fixture::new("S1\tAAAA\tCCCC\n");
        let r1 = [fq("p1", "CCCC"), fq("p2", "CCCC")].concat();
        let r2 = fq("p1", "AAAA");
        let input = InputLayout::PairedEnd(fx.input("r1.fq", &r1), fx.input("r2.fq", &r2));

        let stats = demultiplex(&fx.config(input)).unwrap();

        assert_eq!(stats.total, 1);
        assert!(stats.mate_count_mismatch);
        assert_eq!(fx.output("S1_R1.fq"), fq("p1", "CCCC"));
    }

    #[test]
    fn test_gzip_input() {
        let fx = Fixture::new("S1\tACGT\n");
        let input = fx.gz_input("reads.fq.gz", &fq("r1", "TTACGT"));

        demultiplex(&fx.config(InputLayout::SingleEnd(input))).unwrap();

        assert_eq!(fx.output("S1_R1.fq"), fq("r1", "ACGT"));
    }

    #[test]
    fn test_truncated_input_policies() {
        let fx = Fixture::new("S1\tACGT\n");
        let content = format!("{}@r2\nACGT\n", fq("r1", "ACGT"));
        let input = fx.input("reads.fq", &content);

        let stats = demultiplex(&fx.config(InputLayout::SingleEnd(input.clone()))).unwrap();
        assert_eq!(stats.total, 1);

        let strict = fx
            .config(InputLayout::SingleEnd(input))
            .with_truncation(TruncationPolicy::Error);
        assert!(matches!(
            demultiplex(&strict),
            Err(DemuxError::CorruptRecord { record: 2, .. })
        ));
    }

    #[test]
    fn test_outputs_truncated_on_rerun() {
        let fx = Fixture::new("S1\tACGT\n");
        let input = fx.input("reads.fq", &fq("r1", "ACGT"));
        let config = fx.config(InputLayout::SingleEnd(input));

        demultiplex(&config).unwrap();
        demultiplex(&config).unwrap();

        assert_eq!(fx.output("S1_R1.fq"), fq("r1", "ACGT"));
    }

    #[test]
    fn test_malformed_barcodes_abort_before_outputs() {
        let fx = Fixture::new("S1\tACGT\nbroken\n");
        let input = fx.input("reads.fq", &fq("r1", "ACGT"));

        let result = demultiplex(&fx.config(InputLayout::SingleEnd(input)));

        assert!(matches!(result, Err(DemuxError::MalformedBarcodeFile { line: 2, .. })));
        assert!(!fx.out.join("S1_R1.fq").exists());
    }

    #[test]
    fn test_missing_output_dir() {
        let fx = Fixture::new("S1\tACGT\n");
        let input = fx.input("reads.fq", &fq("r1", "ACGT"));
        let config = fx
            .config(InputLayout::SingleEnd(input))
            .with_output_dir(fx.dir.path().join("missing"));

        assert!(matches!(
            demultiplex(&config),
            Err(DemuxError::MissingOutputDirectory(_))
        ));
    }

    #[test]
    fn test_missing_input_leaves_outputs_untouched() {
        let fx = Fixture::new("S1\tACGT\n");
        std::fs::write(fx.out.join("S1_R1.fq"), "keep me").unwrap();
        let config = fx.config(InputLayout::SingleEnd(fx.dir.path().join("missing.fq")));

        assert!(matches!(
            demultiplex(&config),
            Err(DemuxError::Io { operation: "open", .. })
        ));
        assert_eq!(fx.output("S1_R1.fq"), "keep me");
    }

    #[test]
    fn test_stats_tsv() {
        let fx = Fixture::new("S1\tAAAA\tCCCC\nS2\tGGGG\tTTTT\n");
        let input = InputLayout::PairedEnd(
            fx.input("r1.fq", &[fq("p1", "CCCC"), fq("p2", "TTTT")].concat()),
            fx.input("r2.fq", &[fq("p1", "AAAA"), fq("p2", "CCCC")].concat()),
        );
        let stats_path = fx.dir.path().join("stats.tsv");
        let config = fx.config(input).with_stats(Some(stats_path.clone()));

        demultiplex(&config).unwrap();

        let tsv = std::fs::read_to_string(stats_path).unwrap();
        assert_eq!(
            tsv,
            "sample\treads\tr1_file\tr2_file\n\
             S1\t1\tS1_R1.fq\tS1_R2.fq\n\
             S2\t0\tS2_R1.fq\tS2_R2.fq\n\
             unmatched\t1\t\t\n"
        );
    }
}
