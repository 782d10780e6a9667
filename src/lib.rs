//! Split pooled sequencing runs into per-sample FASTQ files.
//!
//! Each read (or read pair) is searched for the forward/reverse barcodes of a
//! tab-separated barcode table. The first table entry found wins, the read is
//! trimmed so it starts at the barcode and is appended to that sample's
//! `<sample>_R1.fq` (and `<sample>_R2.fq`) file. Reads without a barcode are
//! counted and dropped.

pub mod barcodes;
pub mod config;
pub mod demux;
pub mod error;
pub mod io;
pub mod logging;
pub mod progress;
pub mod read;
pub mod search;
pub mod trim;

pub use config::{DemuxConfig, InputLayout};
pub use demux::{demultiplex, DemuxStats};
pub use error::{DemuxError, Result};
