use anyhow::Context;
use barsplit::config::{DemuxConfig, InputLayout};
use barsplit::demux::demultiplex;
use barsplit::logging::init_logger;
use barsplit::progress::{print_summary, ProgressTracker};
use barsplit::read::TruncationPolicy;
use barsplit::trim::TrimPolicy;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use colored::*;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Split pooled FASTQ reads into per-sample files by in-read barcode pairs"
)]
struct Cli {
    /// Sequencing file, paired-end files separated by a comma (R1.fq.gz,R2.fq.gz)
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Barcode file: sample<TAB>forward[<TAB>reverse] per line
    #[arg(short = 'b', long)]
    bar: Option<PathBuf>,

    /// Output folder, must already exist
    #[arg(short = 'o', long, default_value = ".")]
    output: PathBuf,

    /// Which lines are cut at the barcode position
    #[arg(long, value_enum, default_value_t = TrimPolicy::SeqAndQual)]
    trim: TrimPolicy,

    /// Fail on a truncated final record instead of dropping it
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Write per-sample read counts to this TSV file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Show live read counters
    #[arg(long, default_value_t = false)]
    progress: bool,

    /// Debug logging, including every unmatched read
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    ExitCode::from(run_cli(std::env::args_os()))
}

/// Parse `args`, run the demultiplexer and map the outcome to an exit status
fn run_cli<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
                _ => EXIT_FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    print_banner();

    let (Some(input), Some(bar)) = (cli.input.as_deref(), cli.bar.clone()) else {
        let _ = Cli::command().print_help();
        return EXIT_FAILURE;
    };

    init_logger(cli.verbose);
    let tracker = ProgressTracker::new();

    match run(&cli, input, bar, &tracker) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            tracker.error(&format!("{e:#}"));
            EXIT_FAILURE
        }
    }
}

fn run(cli: &Cli, input: &str, bar: PathBuf, tracker: &ProgressTracker) -> anyhow::Result<()> {
    let layout: InputLayout = input
        .parse()
        .with_context(|| format!("Invalid --input '{input}'"))?;

    let truncation = if cli.strict {
        TruncationPolicy::Error
    } else {
        TruncationPolicy::Discard
    };
    let config = DemuxConfig::new(layout, bar)
        .with_output_dir(&cli.output)
        .with_trim(cli.trim)
        .with_truncation(truncation)
        .with_stats(cli.stats.clone())
        .with_progress(cli.progress);

    tracker.step("Demultiplexing");
    for path in config.input.paths() {
        tracker.substep(&format!("Input:    {}", path.display()));
    }
    tracker.substep(&format!("Barcodes: {}", config.barcodes.display()));
    tracker.substep(&format!("Output:   {}", config.output_dir.display()));

    let stats = demultiplex(&config).context("Demultiplexing failed")?;

    print_summary(&stats, tracker.elapsed());
    if stats.mate_count_mismatch {
        tracker.warning("Paired inputs have a different number of records, extra records were ignored");
    }
    tracker.success("Done!");
    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
    ██████╗  █████╗ ██████╗ ███████╗██████╗ ██╗     ██╗████████╗
    ██╔══██╗██╔══██╗██╔══██╗██╔════╝██╔══██╗██║     ██║╚══██╔══╝
    ██████╔╝███████║██████╔╝███████╗██████╔╝██║     ██║   ██║
    ██╔══██╗██╔══██║██╔══██╗╚════██║██╔═══╝ ██║     ██║   ██║
    ██████╔╝██║  ██║██║  ██║███████║██║     ███████╗██║   ██║
    ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝╚═╝     ╚══════╝╚═╝   ╚═╝
    "#
        .blue()
    );
    println!(
        "{}",
        format!("        [===]------------ v{} ------------[===]        ", env!("CARGO_PKG_VERSION"))
            .bright_yellow()
    );
}
